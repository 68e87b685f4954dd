use argp::FromArgs;

/// Top-level command.
#[derive(FromArgs, PartialEq, Debug)]
#[argp(description = "Reads and extracts Symbian EPOC E32 images and SIS install packages.")]
pub struct Symbex {
    #[argp(option, short = 'v', global, default = "0")]
    #[argp(
        description = "Logging level (0 = Off, 1 = Error, 2 = Warn, 3 = Info, 4 = Debug, 5 = Trace)"
    )]
    pub verbose: usize,

    #[argp(subcommand)]
    pub nested: Modules,
}

/// The operations `symbex` supports via command line.
#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand)]
#[non_exhaustive]
pub enum Modules {
    Identify(IdentifyOption),
    E32(E32Option),
    Sis(SisOption),
}

/// Auto-detect a file's format (E32 image or SIS package) and print which matched.
#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand, name = "identify")]
#[argp(description = "Identify a file and print relevant information")]
pub struct IdentifyOption {
    #[argp(positional)]
    #[argp(description = "Input file to be identified")]
    pub input: String,
}

/// Decompress a Symbian E32 executable image and emit reassembleable ARM source.
#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand, name = "e32")]
#[argp(description = "Decompress an E32 image and emit a relocated .s listing")]
pub struct E32Option {
    #[argp(positional)]
    #[argp(description = "E32 image to be processed")]
    pub input: String,

    #[argp(positional)]
    #[argp(description = "Directory to write the .s listing to")]
    pub output_dir: String,

    #[argp(option)]
    #[argp(description = "Directory of .def files used to resolve ordinal imports")]
    pub defs: Option<String>,
}

/// Extract every installable file out of a SIS package.
#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand, name = "sis")]
#[argp(description = "Extract every file from a SIS installable package")]
pub struct SisOption {
    #[argp(positional)]
    #[argp(description = "SIS package to be processed")]
    pub input: String,

    #[argp(positional)]
    #[argp(description = "Directory to extract files into")]
    pub output_dir: String,
}
