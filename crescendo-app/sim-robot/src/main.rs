use clap::{Parser, ValueEnum};
use core::cell::RefCell;
use crescendo_core::{
    constants::{shooter::ShooterGains, LOOP_PERIOD},
    utils::{
        command::{wait, CommandExt, Scheduler},
        controllers::{Actuator, Intake, Shooter},
        math::units::rpm_to_rad_per_sec,
        sim::{SimMotor, NEO_FREE_SPEED_RPM},
        telemetry::TracingTelemetry,
    },
};
use embassy_executor::Executor;
use embassy_time::{Duration, Instant, Ticker};
use static_cell::StaticCell;
use tracing::{error, info};

/// Time allowed for the flywheel to reach speed before feeding anyway.
const SPINUP_TIMEOUT: Duration = Duration::from_secs(3);
/// Delay before the intake feeds a note into the shooter.
const FEED_DELAY: Duration = Duration::from_millis(2500);

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Routine {
    Intake,
    Outtake,
    Pass,
    Shoot,
}

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts {
    /// Routine to run on the simulated robot
    #[clap(long, value_enum, default_value_t = Routine::Shoot)]
    routine: Routine,
    /// Shooter target speed in radians per second
    #[clap(long, default_value_t = 400.0)]
    target: f32,
    /// Simulated run length in seconds
    #[clap(long, default_value_t = 6)]
    seconds: u64,
    /// Shooter gains as JSON, e.g. '{"kp":0.5,"ki":0.0,"kd":0.0}'
    #[clap(long)]
    gains: Option<String>,
}

fn load_gains(json: Option<&str>) -> ShooterGains {
    match json.map(serde_json::from_str::<ShooterGains>) {
        Some(Ok(gains)) => gains,
        Some(Err(error)) => {
            error!(%error, "invalid shooter gains, using defaults");
            ShooterGains::default()
        }
        None => ShooterGains::default(),
    }
}

#[embassy_executor::task]
async fn robot_task(opts: Opts) {
    let gains = load_gains(opts.gains.as_deref());
    info!(?gains, routine = ?opts.routine, target = opts.target, "starting simulation");

    let intake_motor = RefCell::new(SimMotor::new(NEO_FREE_SPEED_RPM, 0.05));
    // Flywheel encoder reads negative when spinning forward.
    let shooter_motor = RefCell::new(SimMotor::new(NEO_FREE_SPEED_RPM, 0.25).inverted());

    let intake = Intake::new(&intake_motor);
    let shooter = Shooter::new(&shooter_motor, gains, TracingTelemetry);
    let ready = shooter.at_setpoint();

    let mut scheduler = Scheduler::new();
    scheduler.register(&intake);
    scheduler.register(&shooter);

    let start = Instant::now();
    match opts.routine {
        Routine::Intake => {
            scheduler.schedule(intake.intake(), start);
        }
        Routine::Outtake => {
            scheduler.schedule(intake.outtake(), start);
        }
        Routine::Pass => {
            scheduler.schedule(intake.pass(), start);
        }
        Routine::Shoot => {
            let spin = shooter
                .spinup(opts.target)
                .with_timeout(SPINUP_TIMEOUT)
                .and_then(shooter.maintain());
            scheduler.schedule(spin, start);
            scheduler.schedule(wait(FEED_DELAY).and_then(intake.pass()), start);
        }
    }

    let run_for = Duration::from_secs(opts.seconds);
    let mut ticker = Ticker::every(LOOP_PERIOD);
    let mut was_ready = false;
    let mut ticks: u64 = 0;
    loop {
        ticker.next().await;
        let now = Instant::now();

        intake_motor.borrow_mut().step(LOOP_PERIOD);
        shooter_motor.borrow_mut().step(LOOP_PERIOD);
        scheduler.run(now);

        let is_ready = ready.get();
        if is_ready != was_ready {
            info!(is_ready, "shooter readiness changed");
            was_ready = is_ready;
        }

        ticks += 1;
        if ticks % 50 == 0 {
            let flywheel = -rpm_to_rad_per_sec(shooter_motor.borrow().velocity());
            info!(
                flywheel_rad_s = flywheel,
                shooter_volts = shooter_motor.borrow().voltage(),
                intake_volts = intake_motor.borrow().voltage(),
                "tick {}",
                ticks
            );
        }

        if now.duration_since(start) >= run_for {
            break;
        }
    }

    scheduler.schedule(shooter.stop(), Instant::now());
    scheduler.cancel_all();
    info!(
        flywheel_rad_s = -rpm_to_rad_per_sec(shooter_motor.borrow().velocity()),
        setpoint = shooter.setpoint(),
        "simulation finished"
    );
    std::process::exit(0);
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let opts: Opts = Opts::parse();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(robot_task(opts)).unwrap();
    });
}
