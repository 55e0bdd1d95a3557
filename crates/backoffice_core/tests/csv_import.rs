use backoffice_core::db::open_db_in_memory;
use backoffice_core::{
    CsvImportOptions, ImportError, ProjectService, SqliteProjectRepository, SqliteTaskRepository,
    Task, TaskListQuery, TaskPriority, TaskService, TaskServiceError, TaskStatus,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use uuid::Uuid;

const TRACKER_EXPORT: &str = "\u{feff}Title,Project,Priority,Status,Due Date,Notes
Design hero,Website,P1,In Progress,2025-04-01,Figma first
,Website,high,todo,,
Short row

Deploy,website,critical,done,04/15/2025,
Chores,,low,on hold,,
\"Write \"\"About\"\" page\",Blog,whenever,someday,not a date,\"tone, voice\"
";

fn service(conn: &Connection) -> TaskService<SqliteTaskRepository<'_>, SqliteProjectRepository<'_>> {
    TaskService::new(
        SqliteTaskRepository::new(conn),
        SqliteProjectRepository::new(conn),
    )
}

fn find<'a>(tasks: &'a [Task], title: &str) -> &'a Task {
    tasks
        .iter()
        .find(|task| task.title == title)
        .unwrap_or_else(|| panic!("task `{title}` missing"))
}

#[test]
fn import_maps_header_normalizes_values_and_counts_skips() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let report = service
        .import_csv(TRACKER_EXPORT, &CsvImportOptions::default())
        .unwrap();

    assert_eq!(report.imported, 4);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.task_ids.len(), 4);

    let tasks = service.list_tasks(&TaskListQuery::default()).unwrap();
    assert_eq!(tasks.len(), 4);

    let hero = find(&tasks, "Design hero");
    assert_eq!(hero.priority, TaskPriority::High);
    assert_eq!(hero.status, TaskStatus::InProgress);
    assert_eq!(hero.due_date, NaiveDate::from_ymd_opt(2025, 4, 1));
    assert_eq!(hero.description.as_deref(), Some("Figma first"));

    let deploy = find(&tasks, "Deploy");
    assert_eq!(deploy.priority, TaskPriority::Urgent);
    assert_eq!(deploy.status, TaskStatus::Completed);
    assert_eq!(deploy.due_date, NaiveDate::from_ymd_opt(2025, 4, 15));
    assert_eq!(deploy.project_id, hero.project_id);

    let chores = find(&tasks, "Chores");
    assert_eq!(chores.priority, TaskPriority::Low);
    assert_eq!(chores.status, TaskStatus::Blocked);
    assert_eq!(chores.project_id, None);

    let about = find(&tasks, "Write \"About\" page");
    assert_eq!(about.priority, TaskPriority::Medium);
    assert_eq!(about.status, TaskStatus::Todo);
    assert_eq!(about.due_date, None);
    assert_eq!(about.description.as_deref(), Some("tone, voice"));
}

#[test]
fn import_creates_each_missing_project_once() {
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(SqliteProjectRepository::new(&conn));
    let existing = projects.create_project("Blog", None).unwrap();
    let service = service(&conn);

    let report = service
        .import_csv(TRACKER_EXPORT, &CsvImportOptions::default())
        .unwrap();

    let created: Vec<&str> = report
        .created_projects
        .iter()
        .map(|project| project.name.as_str())
        .collect();
    assert_eq!(created, vec!["Website"]);

    let names: Vec<String> = projects
        .list_projects()
        .unwrap()
        .into_iter()
        .map(|project| project.name)
        .collect();
    assert_eq!(names, vec!["Blog".to_string(), "Website".to_string()]);

    let blog_tasks = service
        .list_tasks(&TaskListQuery {
            project_id: Some(existing.id),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(blog_tasks.len(), 1);
}

#[test]
fn headerless_input_uses_positional_columns_and_default_project() {
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(SqliteProjectRepository::new(&conn));
    let inbox = projects.create_project("Inbox", None).unwrap();
    let service = service(&conn);

    let text = "Renew domain;yearly;urgent;todo;2025-12-01\nBackup photos;;low;done;\nbroken";
    let report = service
        .import_csv(
            text,
            &CsvImportOptions {
                delimiter: ';',
                default_project: Some(inbox.id),
                ..CsvImportOptions::default()
            },
        )
        .unwrap();

    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 1);
    assert!(report.created_projects.is_empty());

    let tasks = service
        .list_tasks(&TaskListQuery {
            project_id: Some(inbox.id),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(tasks.len(), 2);
    let renew = find(&tasks, "Renew domain");
    assert_eq!(renew.description.as_deref(), Some("yearly"));
    assert_eq!(renew.priority, TaskPriority::Urgent);
    assert_eq!(renew.due_date, NaiveDate::from_ymd_opt(2025, 12, 1));
}

#[test]
fn rejected_inputs_insert_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    assert!(matches!(
        service.import_csv(" \n\n", &CsvImportOptions::default()),
        Err(TaskServiceError::Import(ImportError::EmptyInput))
    ));
    assert!(matches!(
        service.import_csv("Priority,Status\nhigh,done", &CsvImportOptions::default()),
        Err(TaskServiceError::Import(ImportError::MissingTitleColumn { .. }))
    ));
    assert!(matches!(
        service.import_csv(
            "a:b",
            &CsvImportOptions {
                delimiter: ':',
                ..CsvImportOptions::default()
            }
        ),
        Err(TaskServiceError::Import(ImportError::UnsupportedDelimiter(':')))
    ));
    assert!(matches!(
        service.import_csv(
            "Title\nx",
            &CsvImportOptions {
                default_project: Some(Uuid::new_v4()),
                ..CsvImportOptions::default()
            }
        ),
        Err(TaskServiceError::ProjectNotFound(_))
    ));

    assert!(service.list_tasks(&TaskListQuery::default()).unwrap().is_empty());
}

#[test]
fn header_only_input_imports_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let report = service
        .import_csv("Task,Priority\n", &CsvImportOptions::default())
        .unwrap();
    assert_eq!(report.imported, 0);
    assert_eq!(report.skipped, 0);
    assert!(report.task_ids.is_empty());
}

#[test]
fn project_cells_match_existing_names_across_unicode_case() {
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(SqliteProjectRepository::new(&conn));
    let summer = projects.create_project("Été", None).unwrap();
    let service = service(&conn);

    let report = service
        .import_csv("Title,Project\nA,ÉTÉ\nB, été ", &CsvImportOptions::default())
        .unwrap();

    assert_eq!(report.imported, 2);
    assert!(report.created_projects.is_empty());
    let names: Vec<String> = projects
        .list_projects()
        .unwrap()
        .into_iter()
        .map(|project| project.name)
        .collect();
    assert_eq!(names, vec!["Été".to_string()]);
    let linked = service
        .list_tasks(&TaskListQuery {
            project_id: Some(summer.id),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(linked.len(), 2);
}

#[test]
fn default_project_name_is_created_only_after_input_parses() {
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(SqliteProjectRepository::new(&conn));
    let service = service(&conn);
    let options = |delimiter| CsvImportOptions {
        delimiter,
        default_project_name: Some("Launch".to_string()),
        ..CsvImportOptions::default()
    };

    assert!(matches!(
        service.import_csv("", &options(',')),
        Err(TaskServiceError::Import(ImportError::EmptyInput))
    ));
    assert!(matches!(
        service.import_csv("Title\nx", &options(':')),
        Err(TaskServiceError::Import(ImportError::UnsupportedDelimiter(':')))
    ));
    assert!(matches!(
        service.import_csv("Priority\nhigh", &options(',')),
        Err(TaskServiceError::Import(ImportError::MissingTitleColumn { .. }))
    ));
    assert!(projects.list_projects().unwrap().is_empty());

    let report = service
        .import_csv("Title,Project\nOne,\nTwo,\nThree,Blog", &options(','))
        .unwrap();
    assert_eq!(report.imported, 3);
    let created: Vec<&str> = report
        .created_projects
        .iter()
        .map(|project| project.name.as_str())
        .collect();
    assert_eq!(created, vec!["Launch", "Blog"]);

    let launch = projects.find_project_by_name("launch").unwrap().unwrap();
    let launch_tasks = service
        .list_tasks(&TaskListQuery {
            project_id: Some(launch.id),
            ..TaskListQuery::default()
        })
        .unwrap();
    assert_eq!(launch_tasks.len(), 2);

    let again = service
        .import_csv("Title\nFour", &options(','))
        .unwrap();
    assert!(again.created_projects.is_empty());
    assert_eq!(projects.list_projects().unwrap().len(), 2);
}

#[test]
fn default_project_name_is_not_created_when_every_row_has_a_project() {
    let conn = open_db_in_memory().unwrap();
    let projects = ProjectService::new(SqliteProjectRepository::new(&conn));
    let service = service(&conn);

    let report = service
        .import_csv(
            "Title,Project\nOne,Blog\n,Ignored",
            &CsvImportOptions {
                default_project_name: Some("Launch".to_string()),
                ..CsvImportOptions::default()
            },
        )
        .unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped, 1);
    assert!(projects.find_project_by_name("Launch").unwrap().is_none());
}

#[test]
fn headerless_rows_whose_titles_contain_column_words_stay_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);

    let text = "Write task list,for launch,urgent,done,2025-01-02
Renew domain,yearly,low,blocked,2025-03-04";
    let report = service.import_csv(text, &CsvImportOptions::default()).unwrap();
    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 0);

    let tasks = service.list_tasks(&TaskListQuery::default()).unwrap();
    let write = find(&tasks, "Write task list");
    assert_eq!(write.description.as_deref(), Some("for launch"));
    assert_eq!(write.priority, TaskPriority::Urgent);
    assert_eq!(write.status, TaskStatus::Completed);
    assert_eq!(write.due_date, NaiveDate::from_ymd_opt(2025, 1, 2));

    let report = service
        .import_csv(
            "Fix status page,monthly,urgent,todo\nTeam notes,weekly,low,waiting",
            &CsvImportOptions::default(),
        )
        .unwrap();
    assert_eq!(report.imported, 2);
    let tasks = service.list_tasks(&TaskListQuery::default()).unwrap();
    let fix = find(&tasks, "Fix status page");
    assert_eq!(fix.description.as_deref(), Some("monthly"));
    assert_eq!(fix.status, TaskStatus::Todo);
    assert_eq!(find(&tasks, "Team notes").status, TaskStatus::Blocked);
}
