//! Kata Review Workflow
//!
//! This demo walks a kata through a grouped review workflow.
//!
//! Key concepts:
//! - Grouped states (beta holds needs_feedback and needs_approval)
//! - Hooks declared per phase and inherited by a derived machine
//! - Events that scope hooks to a business action
//! - Protected transitions and the unprotected scope
//! - Tracking who entered a state, and when
//!
//! Run with: RUST_LOG=stateful=trace cargo run --example kata_workflow

use stateful::config::AttributeConfig;
use stateful::core::{StateId, TrackingRecord};
use stateful::hooks::HookError;
use stateful::host::Stateful;
use stateful::ledger::TransitionLedger;
use stateful::{states, Machine, MachineBuilder, StateChangeError};
use tracing_subscriber::EnvFilter;

// Kata entity
#[derive(Debug, Default)]
struct Kata {
    title: String,
    state: Option<StateId>,
    reviewer: Option<String>,
    errors: Vec<String>,
    history: Vec<(StateId, TrackingRecord)>,
    ledger: TransitionLedger,
}

impl Stateful for Kata {
    fn read_state(&self, _attribute: &str) -> Option<StateId> {
        self.state.clone()
    }

    fn write_state(&mut self, _attribute: &str, value: StateId) {
        self.state = Some(value);
    }

    fn ledger(&self) -> &TransitionLedger {
        &self.ledger
    }

    fn add_error(&mut self, attribute: &str, message: String) {
        self.errors.push(format!("{attribute} {message}"));
    }

    fn current_actor(&self) -> Option<String> {
        self.reviewer.clone()
    }

    fn record_tracking(&mut self, _attribute: &str, state: &StateId, record: TrackingRecord) {
        self.history.push((state.clone(), record));
    }

    fn persist(&mut self) -> bool {
        self.errors.is_empty()
    }
}

fn kata_machine() -> Result<Machine<Kata>, Box<dyn std::error::Error>> {
    let config = AttributeConfig::new(
        "state",
        states! {
            draft => beta,
            published => {
                beta => {
                    needs_feedback => [draft, needs_approval],
                    needs_approval => [draft, approved],
                },
                approved => retired,
            },
            retired => none,
        },
    )
    .default_state("draft")
    .event("submit", "beta")
    .event("approve", "approved")
    .track(["beta", "approved"]);

    let machine = MachineBuilder::new("Kata")
        .attribute(config)?
        .when_transition("state", |rules| {
            rules
                .from("draft")
                .to("beta")
                .on_event("submit")
                .after_commit(|kata: &mut Kata, ctx| {
                    println!("  [notify] '{}' submitted, now {}", kata.title, ctx.to);
                    Ok(())
                });
            rules
                .from("needs_approval")
                .to("approved")
                .forbid_if(|kata: &Kata, _| kata.reviewer.is_none());
            rules.from("*").to("retired").protected();
        })?
        .build()?;
    Ok(machine)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Kata Review Workflow ===\n");

    let base = kata_machine()?;
    let machine = MachineBuilder::new("TimedKata")
        .extends(&base)
        .when_transition("state", |rules| {
            rules.from("approved").to("retired").before_commit(|kata: &mut Kata, _| {
                println!("  [archive] '{}' archived", kata.title);
                Ok(())
            });
        })?
        .build()?;
    let state = machine
        .attribute("state")
        .ok_or("state attribute missing")?;

    let mut kata = Kata {
        title: "Bowling score".into(),
        ..Kata::default()
    };
    println!("Start: {:?}", state.value(&kata));
    println!("Allowable events: {:?}\n", state.allowable_events(&kata));

    println!("Step 1: Submit");
    let submit = state.event("submit")?;
    submit.fire(&mut kata, |kata, event| event.transition_to(kata, "needs_feedback"))?;
    println!("  now {:?}, in beta: {}\n", state.value(&kata), state.is(&kata, "beta"));

    println!("Step 2: Skip straight to retired");
    println!("  allowed: {}\n", state.can_transition_to(&kata, "retired"));

    println!("Step 3: Request approval");
    state.change_state(&mut kata, "needs_approval")?;

    println!("Step 4: Approve without a reviewer");
    let approved = state.change_state(&mut kata, "approved")?;
    println!("  committed: {approved}, errors: {:?}\n", kata.errors);

    kata.errors.clear();
    kata.state = Some(StateId::from("needs_approval"));
    kata.reviewer = Some("ada".into());

    println!("Step 5: Approve as ada");
    let approved = state.change_state(&mut kata, "approved")?;
    println!("  committed: {approved}\n");

    println!("Step 6: Retire");
    match state.change_state(&mut kata, "retired") {
        Err(StateChangeError::Hook(HookError::Protected { .. })) => {
            println!("  refused: retiring is protected");
        }
        other => println!("  unexpected: {other:?}"),
    }
    kata.state = Some(StateId::from("approved"));
    let retired = kata.unprotected(|kata| state.change_state(kata, "retired"))?;
    println!("  retired inside unprotected scope: {retired}\n");

    println!("Tracked states:");
    for (tracked, record) in &kata.history {
        println!(
            "  {tracked} by {} (entered {})",
            record.by.as_deref().unwrap_or("nobody"),
            record.value.as_ref().map(StateId::as_str).unwrap_or("-"),
        );
    }

    println!("\n=== Demo Complete ===");
    Ok(())
}
