//! Command-line arguments for the `hostcall` binary.

use argh::FromArgs;
use std::path::PathBuf;

#[derive(FromArgs, Debug)]
/// hostcall - invoke registered host callables by name
pub struct Cli {
    #[argh(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
///
/// - **Call**: run one invocation and print the response envelope
/// - **Types**: list the registered types and their static signatures
#[derive(FromArgs, Debug)]
#[argh(subcommand)]
pub enum Commands {
    Call(CallArgs),
    Types(TypesArgs),
}

/// Arguments for a single invocation.
///
/// The request comes either from `--request` or from `--type` and
/// `--method`. The response envelope is written to stdout as JSON so it can
/// be piped into other tools.
///
/// # Examples
///
/// ```bash
/// hostcall call -t Demo.Math -m Add -p '[{"type":"int","value":2},{"type":"int","value":3}]'
/// hostcall call --request add.json --pretty
/// ```
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "call")]
/// invoke a static callable on the demo host
pub struct CallArgs {
    /// path to a JSON file holding a complete request envelope
    #[argh(option, short = 'r')]
    pub request: Option<PathBuf>,

    /// full or bare name of the type declaring the callable
    #[argh(option, short = 't', long = "type")]
    pub type_name: Option<String>,

    /// name of the static callable
    #[argh(option, short = 'm')]
    pub method: Option<String>,

    /// JSON array of {"type", "value"} parameter descriptors
    #[argh(option, short = 'p')]
    pub params: Option<String>,

    /// sleep between cooperative completion polls, in milliseconds
    ///
    /// When unset the engine yields to the runtime between polls instead.
    #[argh(option, long = "poll-interval-ms")]
    pub poll_interval_ms: Option<u64>,

    /// disable resolving unqualified type names
    #[argh(switch, long = "no-bare-names")]
    pub no_bare_names: bool,

    /// pretty-print the response envelope
    #[argh(switch)]
    pub pretty: bool,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "types")]
/// list the types registered by the demo host
pub struct TypesArgs {}
