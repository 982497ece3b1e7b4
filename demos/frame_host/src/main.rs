//! # frame_host — example host
//!
//! Drives two update groups on a fixed timestep, exercising the parts a
//! real host touches: pre-bind queuing, binding, registration churn while
//! the loop runs, and drop-unbind at shutdown.
//!
//! The loop lives here on purpose — the library only exposes `tick()`;
//! deciding when a cycle happens is the host's job.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pulse_events::EventBus;
use pulse_random::WeightedList;
use pulse_sched::{GroupUpdater, UpdateDirectory};
use pulse_tick::{TickHandle, Tickable, UpdateGroup};

/// Simulation-side update group.
struct Simulation;

impl UpdateGroup for Simulation {
    fn group_name() -> &'static str {
        "Simulation"
    }
}

/// Presentation-side update group.
struct Presentation;

impl UpdateGroup for Presentation {
    fn group_name() -> &'static str {
        "Presentation"
    }
}

/// Published on the bus after every completed cycle.
struct CycleFinished {
    cycle: u64,
}

#[derive(Debug, Parser)]
#[command(about = "Fixed-timestep host for pulse update groups")]
struct Args {
    /// Target cycles per second.
    #[arg(long, default_value_t = 60.0)]
    tick_rate: f64,

    /// Number of cycles to run before exiting.
    #[arg(long, default_value_t = 300)]
    max_ticks: u64,
}

/// A stand-in game object: counts how many steps it has been driven.
struct Body {
    name: &'static str,
    steps: AtomicU64,
}

impl Body {
    fn named(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            steps: AtomicU64::new(0),
        })
    }

    fn steps(&self) -> u64 {
        self.steps.load(Ordering::Relaxed)
    }
}

impl Tickable for Body {
    fn tick(&self) {
        self.steps.fetch_add(1, Ordering::Relaxed);
    }
}

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("frame_host=info".parse()?))
        .init();

    let args = Args::parse();
    info!(
        tick_rate = args.tick_rate,
        max_ticks = args.max_ticks,
        "frame host starting"
    );

    let directory = Arc::new(UpdateDirectory::new());
    let bus = Arc::new(EventBus::new());

    // Producers may register before any updater exists; the directory
    // queues the request until the group binds below.
    let early = Body::named("early");
    directory.register_in::<Simulation>(TickHandle::new(&early));

    let simulation = GroupUpdater::bind_group::<Simulation>(Arc::clone(&directory))?;
    let presentation = GroupUpdater::bind_group::<Presentation>(Arc::clone(&directory))?;
    info!(
        simulation = %simulation.instance_id(),
        presentation = %presentation.instance_id(),
        "update groups bound"
    );

    // A weighted roll decides which variant joins mid-run.
    let mut variants = WeightedList::new();
    variants.push("walker", 3.0);
    variants.push("flyer", 1.0);
    let late = Body::named(variants.pick().copied().unwrap_or("walker"));

    let _cycle_log = bus.subscribe::<CycleFinished>(|event| {
        if event.cycle % 60 == 0 {
            info!(cycle = event.cycle, "cycle finished");
        }
    });

    let tick_duration = Duration::from_secs_f64(1.0 / args.tick_rate);
    let mut cycle = 0u64;

    loop {
        let start = Instant::now();

        simulation.tick();
        presentation.tick();

        cycle += 1;
        bus.publish(&CycleFinished { cycle });

        if cycle == args.max_ticks / 2 {
            // Churn mid-run: retire the early body, admit the late one.
            directory.unregister_in::<Simulation>(TickHandle::new(&early));
            directory.register_in::<Presentation>(TickHandle::new(&late));
            info!(retired = early.name, admitted = late.name, "swapped bodies");
        }

        if cycle >= args.max_ticks {
            break;
        }

        let elapsed = start.elapsed();
        if elapsed < tick_duration {
            std::thread::sleep(tick_duration - elapsed);
        } else {
            warn!(
                cycle,
                elapsed_ms = elapsed.as_millis() as u64,
                budget_ms = tick_duration.as_millis() as u64,
                "cycle exceeded time budget"
            );
        }
    }

    info!(
        cycles = cycle,
        early_steps = early.steps(),
        late_steps = late.steps(),
        "frame host finished"
    );

    // Dropping the updaters unbinds their groups; late registrations from
    // here on would queue until someone binds again.
    drop(simulation);
    drop(presentation);

    Ok(())
}
