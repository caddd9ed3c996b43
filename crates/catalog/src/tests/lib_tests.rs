use super::*;

use std::io::Write as _;

const TWO_TASKS: &str = r#"
[[tasks]]
title = "Warm-up"
initial_prompt = "What is 2 + 2?"
assistance = ["Count on your fingers.", "2 + 2 = 4"]
update_prompt = "Now add one more."

[[tasks]]
title = "Choice"
initial_prompt = "Pick a colour."
assistance = ["Any colour works."]
update_prompt = "Red is gone. Pick again."
choices = ["Blue", "Green"]
"#;

#[test]
fn builtin_catalog_has_four_tasks_in_order() {
    let catalog = TaskCatalog::builtin();
    assert_eq!(catalog.len(), 4);
    let ids: Vec<u32> = catalog.tasks().iter().map(|t| t.id.0).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    for task in catalog.tasks() {
        validate_task(task).expect("builtin task is valid");
    }
}

#[test]
fn only_perspective_task_uses_choices() {
    let catalog = TaskCatalog::builtin();
    let choice_tasks: Vec<&str> = catalog
        .tasks()
        .iter()
        .filter(|t| t.is_choice_task())
        .map(|t| t.title.as_str())
        .collect();
    assert_eq!(choice_tasks, vec!["Perspective Switching"]);
    assert_eq!(
        catalog.get(1).and_then(|t| t.choice(2)),
        Some("Cameras are unnecessary for security.")
    );
}

#[test]
fn parses_toml_and_assigns_ordinals_by_position() {
    let catalog = TaskCatalog::from_toml_str(TWO_TASKS).expect("catalog");
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.get(0).map(|t| t.id), Some(TaskId(1)));
    assert_eq!(catalog.get(1).map(|t| t.id), Some(TaskId(2)));
    assert!(catalog.get(0).is_some_and(|t| !t.is_choice_task()));
    assert_eq!(catalog.get(1).and_then(|t| t.choice(0)), Some("Blue"));
}

#[test]
fn shorter_catalog_is_accepted_but_flagged() {
    let catalog = TaskCatalog::from_toml_str(TWO_TASKS).expect("catalog");
    assert!(!catalog.matches_study_design());
    assert!(TaskCatalog::builtin().matches_study_design());
    assert_eq!(TaskCatalog::builtin().len(), STUDY_TASK_COUNT);
}

#[test]
fn rejects_empty_catalog() {
    let err = TaskCatalog::from_toml_str("tasks = []").expect_err("empty");
    assert!(matches!(err, CatalogError::Empty));
}

#[test]
fn rejects_blank_prompt() {
    let raw = r#"
[[tasks]]
title = "Blank"
initial_prompt = "   "
assistance = ["step"]
update_prompt = "update"
"#;
    let err = TaskCatalog::from_toml_str(raw).expect_err("blank prompt");
    assert!(matches!(
        err,
        CatalogError::EmptyField {
            task: TaskId(1),
            field: "initial_prompt"
        }
    ));
}

#[test]
fn rejects_missing_assistance_and_empty_choice_list() {
    let no_assistance = r#"
[[tasks]]
title = "t"
initial_prompt = "i"
assistance = []
update_prompt = "u"
"#;
    assert!(matches!(
        TaskCatalog::from_toml_str(no_assistance),
        Err(CatalogError::EmptyField {
            field: "assistance",
            ..
        })
    ));

    let no_choices = r#"
[[tasks]]
title = "t"
initial_prompt = "i"
assistance = ["a"]
update_prompt = "u"
choices = []
"#;
    assert!(matches!(
        TaskCatalog::from_toml_str(no_choices),
        Err(CatalogError::EmptyChoices { task: TaskId(1) })
    ));
}

#[test]
fn loads_catalog_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(TWO_TASKS.as_bytes()).expect("write");

    let catalog = TaskCatalog::load(file.path()).expect("load");
    assert_eq!(catalog.len(), 2);
}

#[test]
fn missing_file_reports_path() {
    let err = TaskCatalog::load(Path::new("/definitely/not/here.toml")).expect_err("missing");
    assert!(err.to_string().contains("/definitely/not/here.toml"));
}
