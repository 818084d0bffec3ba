use crate::error::ConfigError;
use crate::model::Config;
use clap::Parser;

/// Flags that take a value. Anything else on the command line is dropped.
const VALUE_FLAGS: [&str; 5] = ["uri", "threads", "poolsize", "minutes", "sleepms"];

/// Passed through untouched so clap can answer them.
const CLAP_FLAGS: [&str; 4] = ["-h", "--help", "-V", "--version"];

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None, args_override_self = true)]
pub struct Args {
    /// Base URI of the target server
    #[arg(long, default_value = "")]
    pub uri: String,

    /// Number of concurrent workers
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub threads: u32,

    /// Accepted for compatibility, ignored
    #[arg(long, default_value_t = 0)]
    pub poolsize: i32,

    /// How long each worker keeps sending requests
    #[arg(long, default_value_t = 1)]
    pub minutes: u32,

    /// Pause before each request, in milliseconds
    #[arg(long, default_value_t = 0)]
    pub sleepms: u64,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Config {
            uri: args.uri,
            threads: args.threads as usize,
            minutes: f64::from(args.minutes),
            sleepms: args.sleepms,
            poolsize: args.poolsize,
        }
    }
}

/// Rewrites `-name value` style arguments into `--name=value` and drops
/// everything unrecognised. The first element (program name) is kept.
///
/// A recognised flag takes the following argument as its value, whatever it
/// looks like, and that argument is then scanned like any other: in
/// `-uri -threads 4` the uri is `-threads` and threads is 4. A trailing flag
/// with nothing after it is emitted bare so clap reports the missing value.
pub fn scan<I>(argv: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let argv: Vec<String> = argv.into_iter().collect();
    let mut out: Vec<String> = argv.first().cloned().into_iter().collect();
    let mut is_value = false;

    for (i, arg) in argv.iter().enumerate().skip(1) {
        let was_value = std::mem::replace(&mut is_value, false);
        if CLAP_FLAGS.contains(&arg.as_str()) {
            if !was_value {
                out.push(arg.clone());
            }
            continue;
        }
        let Some(name) = arg.strip_prefix("--").or_else(|| arg.strip_prefix('-')) else {
            continue;
        };
        if let Some((name, value)) = name.split_once('=') {
            if VALUE_FLAGS.contains(&name) {
                out.push(format!("--{name}={value}"));
            }
            continue;
        }
        if !VALUE_FLAGS.contains(&name) {
            continue;
        }
        match argv.get(i + 1) {
            Some(value) => {
                out.push(format!("--{name}={value}"));
                is_value = true;
            }
            None => out.push(format!("--{name}")),
        }
    }
    out
}

pub fn parse_from<I>(argv: I) -> Result<Config, ConfigError>
where
    I: IntoIterator<Item = String>,
{
    let args = Args::try_parse_from(scan(argv))?;
    Ok(args.into())
}

pub fn parse() -> Result<Config, ConfigError> {
    parse_from(std::env::args())
}
