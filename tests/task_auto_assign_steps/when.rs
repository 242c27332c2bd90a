//! When steps for automatic assignment BDD scenarios.

use super::world::{AutoAssignWorld, run_async};
use rstest_bdd_macros::when;

#[when("automatic assignment runs with a limit of {limit:u32}")]
fn automatic_assignment_runs(world: &mut AutoAssignWorld, limit: u32) {
    let result = run_async(world.service.auto_assign_tasks(world.org, limit));
    world.last_report = Some(result);
}
