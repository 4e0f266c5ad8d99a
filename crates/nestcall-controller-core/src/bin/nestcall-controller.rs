//! Binary entry point: wires up the controller and runs it until shutdown.

use anyhow::Result;
use nestcall_controller_core::{try_or_exit, Controller};

#[actix_web::main]
async fn main() {
    try_or_exit(run()).await;
}

async fn run() -> Result<()> {
    let controller = Controller::create("nestcall call orchestration controller").await?;
    controller.run().await
}
