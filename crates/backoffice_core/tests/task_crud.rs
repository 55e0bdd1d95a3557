use backoffice_core::db::open_db_in_memory;
use backoffice_core::{
    NewTask, ProjectRepository, ProjectService, RepoError, SqliteProjectRepository,
    SqliteTaskRepository, Task, TaskListQuery, TaskPriority, TaskRepository, TaskService,
    TaskServiceError, TaskStatus, ValidationError,
};
use chrono::NaiveDate;
use uuid::Uuid;

#[test]
fn create_and_get_task_round_trip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::new(&conn);

    let mut task = Task::new("  Ship landing page  ");
    task.description = Some("hero + pricing".to_string());
    task.priority = TaskPriority::High;
    task.due_date = NaiveDate::from_ymd_opt(2025, 3, 31);
    repo.create_task(&task).unwrap();

    let loaded = repo.get_task(task.id, false).unwrap().unwrap();
    assert_eq!(loaded, task);
    assert_eq!(loaded.title, "Ship landing page");
}

#[test]
fn blank_title_is_rejected_before_insert() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::new(&conn);

    let err = repo.create_task(&Task::new("   ")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::BlankField("task title"))
    ));
}

#[test]
fn batch_insert_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteTaskRepository::new(&conn);

    let first = Task::new("first");
    let duplicate = first.clone();
    assert!(repo.create_tasks(&[first.clone(), duplicate]).is_err());
    assert!(repo.get_task(first.id, true).unwrap().is_none());

    let ids = repo
        .create_tasks(&[Task::new("a"), Task::new("b")])
        .unwrap();
    assert_eq!(ids.len(), 2);
    assert_eq!(repo.list_tasks(&TaskListQuery::default()).unwrap().len(), 2);
}

#[test]
fn list_filters_by_project_status_and_priority() {
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(SqliteProjectRepository::new(&conn));
    let service = TaskService::new(
        SqliteTaskRepository::new(&conn),
        SqliteProjectRepository::new(&conn),
    );
    let website = projects.create_project("Website", None).unwrap();

    let mut urgent = NewTask::titled("fix checkout");
    urgent.project_id = Some(website.id);
    urgent.priority = TaskPriority::Urgent;
    let urgent = service.create_task(urgent).unwrap();

    let mut done = NewTask::titled("write changelog");
    done.project_id = Some(website.id);
    done.status = TaskStatus::Completed;
    service.create_task(done).unwrap();

    service.create_task(NewTask::titled("unfiled")).unwrap();

    let in_project = service
        .list_tasks(&TaskListQuery {
            project_id: Some(website.id),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(in_project.len(), 2);

    let open_urgent = service
        .list_tasks(&TaskListQuery {
            status: Some(TaskStatus::Todo),
            priority: Some(TaskPriority::Urgent),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(open_urgent.len(), 1);
    assert_eq!(open_urgent[0].id, urgent.id);

    let paged = service
        .list_tasks(&TaskListQuery {
            limit: Some(1),
            offset: 1,
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(paged.len(), 1);
}

#[test]
fn set_status_and_soft_delete() {
    let conn = open_db_in_memory().unwrap();
    let service = TaskService::new(
        SqliteTaskRepository::new(&conn),
        SqliteProjectRepository::new(&conn),
    );
    let task = service.create_task(NewTask::titled("review PR")).unwrap();

    let updated = service.set_status(task.id, TaskStatus::InProgress).unwrap();
    assert_eq!(updated.status, TaskStatus::InProgress);
    assert!(updated.updated_at >= task.updated_at);

    service.delete_task(task.id).unwrap();
    assert!(service.get_task(task.id).unwrap().is_none());
    assert!(service.list_tasks(&TaskListQuery::default()).unwrap().is_empty());

    let with_deleted = service
        .list_tasks(&TaskListQuery {
            include_deleted: true,
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(with_deleted.len(), 1);
    assert!(with_deleted[0].is_deleted);

    let err = service.set_status(task.id, TaskStatus::Completed).unwrap_err();
    assert!(matches!(err, TaskServiceError::TaskNotFound(id) if id == task.id));
}

#[test]
fn task_cannot_reference_missing_or_deleted_project() {
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(SqliteProjectRepository::new(&conn));
    let service = TaskService::new(
        SqliteTaskRepository::new(&conn),
        SqliteProjectRepository::new(&conn),
    );

    let mut orphan = NewTask::titled("orphan");
    orphan.project_id = Some(Uuid::new_v4());
    assert!(matches!(
        service.create_task(orphan),
        Err(TaskServiceError::ProjectNotFound(_))
    ));

    let archived = projects.create_project("Archived", None).unwrap();
    projects.delete_project(archived.id).unwrap();
    let mut late = NewTask::titled("late");
    late.project_id = Some(archived.id);
    assert!(matches!(
        service.create_task(late),
        Err(TaskServiceError::ProjectNotFound(id)) if id == archived.id
    ));
}

#[test]
fn project_names_are_unique_case_insensitively_among_active_projects() {
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(SqliteProjectRepository::new(&conn));

    let first = projects
        .create_project(" Portfolio ", Some("  personal site "))
        .unwrap();
    assert_eq!(first.name, "Portfolio");
    assert_eq!(first.description.as_deref(), Some("personal site"));

    assert!(matches!(
        projects.create_project("portfolio", None),
        Err(RepoError::Conflict(_))
    ));

    let found = projects.find_project_by_name("PORTFOLIO").unwrap().unwrap();
    assert_eq!(found.id, first.id);

    projects.delete_project(first.id).unwrap();
    assert!(projects.find_project_by_name("portfolio").unwrap().is_none());
    let reborn = projects.create_project("portfolio", None).unwrap();
    assert_ne!(reborn.id, first.id);
}

#[test]
fn project_name_uniqueness_folds_non_ascii_case() {
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(SqliteProjectRepository::new(&conn));

    let summer = projects.create_project("Été", None).unwrap();
    assert!(matches!(
        projects.create_project("été", None),
        Err(RepoError::Conflict(_))
    ));
    let winter = projects.create_project("Hiver", None).unwrap();
    assert!(matches!(
        projects.rename_project(winter.id, " ÉTÉ "),
        Err(RepoError::Conflict(_))
    ));

    let found = projects.find_project_by_name("ÉTÉ").unwrap().unwrap();
    assert_eq!(found.id, summer.id);

    let raw_duplicate = conn.execute(
        "INSERT INTO task_projects (uuid, name, name_key, created_at, updated_at)
         VALUES ('dup', 'ÉTÉ', 'été', 0, 0);",
        [],
    );
    assert!(raw_duplicate.is_err());
}

#[test]
fn rename_and_list_projects() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteProjectRepository::new(&conn);
    let projects = ProjectService::new(SqliteProjectRepository::new(&conn));

    let beta = projects.create_project("beta", None).unwrap();
    projects.create_project("Alpha", None).unwrap();

    let renamed = projects.rename_project(beta.id, "  Gamma ").unwrap();
    assert_eq!(renamed.name, "Gamma");

    let names: Vec<String> = projects
        .list_projects()
        .unwrap()
        .into_iter()
        .map(|project| project.name)
        .collect();
    assert_eq!(names, vec!["Alpha".to_string(), "Gamma".to_string()]);

    assert!(matches!(
        projects.rename_project(beta.id, " "),
        Err(RepoError::Validation(ValidationError::BlankField("project name")))
    ));
    assert!(matches!(
        repo.soft_delete_project(Uuid::new_v4()),
        Err(RepoError::NotFound { entity: "project", .. })
    ));
}
