use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use encoding_rs::Encoding;
use engine::{
    AggregateStatistics, AttackContext, AttackSurge, AttackType, AttackerProfile,
    Channel, ContextFormat, CoverCategory, DefenderProfile, DefenseColor, DefenseSurge, Dice,
    EvaluateOptions, GuardianProfile, Mode, Source,
};
use std::{fs, path::Path, path::PathBuf};
use tracing::Level;

#[derive(Copy, Clone, ValueEnum)]
enum ModeArg {
    Sample,
    Exact,
}

impl From<ModeArg> for Mode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Sample => Mode::Sample,
            ModeArg::Exact => Mode::Exact,
        }
    }
}

#[derive(Subcommand)]
enum Cmd {
    /// Resolve a single attack and print its outcome
    Roll {
        /// Attack context file (.json, .yaml or .yml)
        #[arg(long)]
        config: PathBuf,
        /// RNG seed for determinism
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Aggregate wound statistics over many attacks
    Evaluate {
        /// Attack context file (.json, .yaml or .yml)
        #[arg(long)]
        config: PathBuf,
        /// Sample with seeded dice or enumerate every outcome
        #[arg(long, value_enum, default_value_t = ModeArg::Sample)]
        mode: ModeArg,
        /// Number of sampled attacks
        #[arg(long)]
        iterations: Option<u32>,
        /// RNG base seed (trial i uses seed+i); random if omitted
        #[arg(long)]
        seed: Option<u64>,
        /// Sampling threads (0 = all cores)
        #[arg(long, default_value_t = 0)]
        workers: usize,
        /// Print JSON instead of a text table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print a sample attack context as JSON
    Dump {
        /// Pretty-print JSON
        #[arg(long, default_value_t = true)]
        pretty: bool,
    },
}

#[derive(Parser)]
#[command(name = "attack-sim")]
#[command(about = "Dice combat attack simulator")]
struct Cli {
    /// More log output on stderr (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_text_auto(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

fn load_context(path: &Path) -> anyhow::Result<AttackContext> {
    let text = read_text_auto(path)?;
    let ctx = engine::parse_context(&text, ContextFormat::from_path(path))
        .with_context(|| format!("loading {}", path.display()))?;
    Ok(ctx)
}

fn sample_context() -> AttackContext {
    // Rifle squad into a guarded heavy-weapons team behind light cover
    let mut attacker = AttackerProfile::new(AttackSurge::Hit);
    attacker.white = 4;
    attacker.black = 1;
    attacker.aim = 1;
    attacker.pierce = 1;

    let mut defender = DefenderProfile::new(DefenseColor::Red, DefenseSurge::Blank);
    defender.cover = CoverCategory::Light;
    defender.miniatures = 2;
    defender.wounds_per_miniature = 1;
    defender.dodge_tokens = 1;
    defender.guardian = Some(GuardianProfile::new(2, DefenseColor::White, DefenseSurge::Block));

    let mut ctx = AttackContext::new(attacker, defender, AttackType::Ranged);
    ctx.attacker_points = Some(60);
    ctx.defender_points = Some(44);
    ctx
}

fn fmt_ratio(x: f64) -> String {
    if x.is_finite() {
        format!("{x:.4}")
    } else {
        "n/a".to_string()
    }
}

fn render_text(stats: &AggregateStatistics) -> String {
    let mut out = String::new();
    match stats.source {
        Source::Sampled { iterations, seed } => {
            out.push_str(&format!("sampled {iterations} attacks (seed {seed})\n"));
        }
        Source::Exact { paths } => {
            out.push_str(&format!("exact over {paths} outcome paths\n"));
        }
    }
    for channel in Channel::ALL {
        let Some(s) = stats.channel(channel) else {
            continue;
        };
        let name = match channel {
            Channel::Defender => "defender",
            Channel::Guardian => "guardian",
            Channel::Reflection => "reflection",
            Channel::Secondary => "secondary",
        };
        out.push_str(&format!(
            "{name:<10} mean={:.4} sd={:.4} median={} mode={} range={}..={}\n",
            s.mean, s.std_dev, s.median, s.mode, s.min, s.max
        ));
    }
    if let Some(s) = stats.channel(Channel::Defender) {
        for (x, p) in s.at_least.iter().enumerate().skip(1) {
            out.push_str(&format!("  P(wounds >= {x}) = {p:.4}\n"));
        }
    }
    out.push_str(&format!("suppression chance = {:.4}\n", stats.suppression_chance));
    let e = &stats.efficiency;
    out.push_str(&format!(
        "wounds/point={} points/wound={} value ratio={}\n",
        fmt_ratio(e.wounds_per_point),
        fmt_ratio(e.points_per_wound),
        fmt_ratio(e.value_ratio)
    ));
    out
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.cmd {
        Cmd::Roll { config, seed } => {
            let ctx = load_context(&config)?;
            let mut dice = Dice::from_seed(seed);
            let outcome = engine::resolve_attack(&ctx, &mut dice);
            println!(
                "wounds={} guardian={} reflection={} secondary={} suppressed={}",
                outcome.wounds_to_defender,
                outcome.wounds_to_guardian,
                outcome.reflection_wounds,
                outcome.secondary_wounds,
                outcome.defender_suppressed
            );
        }
        Cmd::Evaluate {
            config,
            mode,
            iterations,
            seed,
            workers,
            json,
        } => {
            let ctx = load_context(&config)?;
            let options = EvaluateOptions {
                mode: mode.into(),
                iterations,
                seed,
                workers,
                ..EvaluateOptions::default()
            };
            let stats = engine::evaluate(&ctx, &options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print!("{}", render_text(&stats));
            }
        }
        Cmd::Dump { pretty } => {
            let ctx = sample_context();
            if pretty {
                println!("{}", serde_json::to_string_pretty(&ctx)?);
            } else {
                println!("{}", serde_json::to_string(&ctx)?);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_context_survives_json() {
        let ctx = sample_context();
        let text = serde_json::to_string(&ctx).unwrap();
        let back = engine::parse_context(&text, ContextFormat::Json).unwrap();
        assert_eq!(back, ctx);
    }

    #[test]
    fn missing_ratios_print_as_na() {
        assert_eq!(fmt_ratio(f64::NAN), "n/a");
        assert_eq!(fmt_ratio(0.5), "0.5000");
    }

    #[test]
    fn sample_pool_is_white_then_black() {
        assert_eq!(sample_context().attacker.pool(), [4, 1, 0]);
    }
}
