//! Given steps for automatic assignment BDD scenarios.

use super::world::{AutoAssignWorld, run_async};
use eyre::WrapErr;
use reunion::directory::domain::{Role, User, UserId};
use reunion::task::{domain::TaskPriority, services::CreateTaskRequest};
use rstest_bdd_macros::given;

#[given(r#"an organization with members "{names}""#)]
fn organization_with_members(
    world: &mut AutoAssignWorld,
    names: String,
) -> Result<(), eyre::Report> {
    for name in names.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let id = UserId::new();
        world
            .directory
            .insert_user(User::new(id, name, Role::Volunteer, Some(world.org))?)?;
        world.members.insert(name.to_owned(), id);
    }
    Ok(())
}

#[given("an organization with no members")]
fn organization_without_members(world: &mut AutoAssignWorld) {
    world.members.clear();
}

#[given(r#""{name}" already holds {count:u32} tasks"#)]
fn member_holds_tasks(
    world: &mut AutoAssignWorld,
    name: String,
    count: u32,
) -> Result<(), eyre::Report> {
    let holder = world.member(&name)?;
    for index in 1..=count {
        let details = world.details(&format!("Earlier sweep {index}"), TaskPriority::Normal);
        let request = CreateTaskRequest::new(world.reporter, details).with_assignee(holder);
        run_async(world.service.create_task(request)).wrap_err("create held task")?;
    }
    Ok(())
}

#[given(r#"a pending "{priority}" task "{title}""#)]
fn pending_task(
    world: &mut AutoAssignWorld,
    priority: String,
    title: String,
) -> Result<(), eyre::Report> {
    let level = TaskPriority::try_from(priority.as_str())
        .map_err(|err| eyre::eyre!("invalid priority in scenario: {err}"))?;
    let details = world.details(&title, level);
    let task = run_async(
        world
            .service
            .create_task(CreateTaskRequest::new(world.reporter, details)),
    )
    .wrap_err("create pending task")?;
    world.tasks.insert(title, task.id());
    Ok(())
}
