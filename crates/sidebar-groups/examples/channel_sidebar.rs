//! Channel Sidebar Demo
//!
//! Simulates a chat client's channel list being rendered, extended,
//! re-rendered and clicked, printing the grouped sidebar after each step.
//!
//! Run with: cargo run -p sidebar-groups --example channel_sidebar
//! Set `RUST_LOG=sidebar_groups=debug` to see pass summaries.

use std::sync::Arc;
use std::time::Duration;

use sidebar_groups::debug::{GroupTreeDebug, TreeFormatOptions};
use sidebar_groups::{GroupKey, GrouperConfig, MemoryHost, SidebarGrouper, Visibility};
use sidebar_groups_core::{Dispatcher, ManualClock};
use tracing_subscriber::EnvFilter;

fn print_step(title: &str, grouper: &SidebarGrouper) {
    let debug = GroupTreeDebug::with_options(TreeFormatOptions::minimal());
    println!("── {title}");
    print!("{}", debug.format_engine(grouper.engine()));
    println!();
}

/// Let the host go idle until no grouping pass is pending.
fn settle(dispatcher: &Dispatcher, grouper: &SidebarGrouper) {
    while grouper.engine().has_pending_pass() {
        dispatcher.process(true);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let clock = ManualClock::new();
    let dispatcher = Arc::new(Dispatcher::new(Arc::new(clock.clone())));
    let host = Arc::new(MemoryHost::new());
    let config = GrouperConfig::default().with_poll_interval(Duration::from_millis(50));
    let grouper = SidebarGrouper::install(host.clone(), dispatcher.clone(), config)?;

    // The client takes a moment to render its list.
    clock.advance(Duration::from_millis(120));
    dispatcher.process(false);
    host.push_row("deploys", true);
    host.push_row("deploys-prod", true);
    for name in [
        "eng",
        "eng-backend",
        "eng-frontend",
        "eng_infra",
        "general",
        "ops-alerts",
        "ops-oncall",
        "random",
    ] {
        host.push_row(name, false);
    }
    // Sleep until the next poll notices the rows.
    if let Some(wait) = dispatcher.time_until_next() {
        clock.advance(wait);
    }
    dispatcher.process(false);
    settle(&dispatcher, &grouper);
    print_step("initial render", &grouper);

    let eng = GroupKey::new("eng", false);
    if let Some(header) = host.header_for(&eng) {
        host.click_header(header);
    }
    print_step("collapsed eng", &grouper);

    host.set_visibility(Visibility::Hidden);
    host.push_row("ops-incidents", false);
    host.set_visibility(Visibility::Visible);
    settle(&dispatcher, &grouper);
    print_step("joined ops-incidents while in the background", &grouper);

    host.rerender_all();
    settle(&dispatcher, &grouper);
    print_step("client re-rendered the whole list", &grouper);

    grouper.shutdown();
    Ok(())
}
