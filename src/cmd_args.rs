use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
pub use clap::Parser;
use ini::Ini;

use crate::config;
use crate::http::ClientOptions;
use crate::variables::VariableStore;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct ClapArgs {
    /// Script files to run, in order
    #[arg(value_name = "FILE")]
    files: Vec<String>,

    #[arg(short = 'v', long, help = "turn on verbose output")]
    verbose: bool,

    #[arg(short = 'L', long, help = "follow redirects")]
    location: bool,

    #[arg(short = 'k', long, help = "allow insecure SSL connections")]
    insecure: bool,

    #[arg(short = 'x', long, value_name = "[PROTOCOL://]HOST[:PORT]", help = "use proxy on given protocol/host/port")]
    proxy: Option<String>,

    /// Define a variable, NAME=VALUE. May be repeated.
    #[arg(long = "variable", value_name = "NAME=VALUE", help = "define a variable")]
    variables: Vec<String>,

    /// Properties file with one NAME=VALUE per line
    #[arg(long, value_name = "FILE", help = "define variables from a properties file")]
    variables_file: Option<String>,

    #[arg(long, value_name = "DIR", help = "set root directory for file bodies")]
    file_root: Option<String>,

    #[arg(short = 'i', long, help = "include protocol and headers in the output")]
    include: bool,

    #[arg(long, value_name = "ENTRY", help = "execute script up to this entry (1-based)")]
    to_entry: Option<usize>,

    #[arg(long, help = "request a compressed response and decode it")]
    compressed: bool,

    #[arg(short = 'o', long, value_name = "FILE", help = "write the last response body to a file")]
    output: Option<String>,

    #[arg(short = 'u', long, value_name = "USER:PASSWORD", help = "server user and password")]
    user: Option<String>,

    #[arg(long, value_name = "SECONDS", help = "maximum time allowed for connection")]
    connect_timeout: Option<u64>,

    #[arg(short = 'm', long, value_name = "SECONDS", help = "maximum time allowed for the transfer")]
    max_time: Option<u64>,

    #[arg(long, help = "activate test mode")]
    test: bool,

    #[arg(long, value_name = "FILE", help = "write a JSON report of the run")]
    json: Option<String>,

    #[arg(long, overrides_with = "no_color", help = "colorize output")]
    color: bool,

    #[arg(long, overrides_with = "color", help = "do not colorize output")]
    no_color: bool,
}

#[derive(Debug, Clone)]
pub struct CommandLineArgs {
    files: Vec<String>,
    verbose: bool,
    location: bool,
    insecure: bool,
    proxy: Option<String>,
    variables: Vec<String>,
    variables_file: Option<PathBuf>,
    file_root: Option<PathBuf>,
    include: bool,
    to_entry: Option<usize>,
    compressed: bool,
    output: Option<PathBuf>,
    user: Option<String>,
    connect_timeout: Option<u64>,
    max_time: Option<u64>,
    test: bool,
    json: Option<PathBuf>,
    color: Option<bool>,
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

impl From<ClapArgs> for CommandLineArgs {
    fn from(args: ClapArgs) -> Self {
        let color = match (args.color, args.no_color) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Self {
            files: args.files,
            verbose: args.verbose,
            location: args.location,
            insecure: args.insecure,
            proxy: args.proxy,
            variables: args.variables,
            variables_file: args.variables_file.as_deref().map(expand),
            file_root: args.file_root.as_deref().map(expand),
            include: args.include,
            to_entry: args.to_entry,
            compressed: args.compressed,
            output: args.output.as_deref().map(expand),
            user: args.user,
            connect_timeout: args.connect_timeout,
            max_time: args.max_time,
            test: args.test,
            json: args.json.as_deref().map(expand),
            color,
        }
    }
}

impl CommandLineArgs {
    pub fn parse() -> Self {
        ClapArgs::parse().into()
    }

    pub fn parse_from<I, T>(itr: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        ClapArgs::parse_from(itr).into()
    }

    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        ClapArgs::try_parse_from(itr).map(Into::into)
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    pub fn include(&self) -> bool {
        self.include
    }

    pub fn to_entry(&self) -> Option<usize> {
        self.to_entry
    }

    pub fn output(&self) -> Option<&PathBuf> {
        self.output.as_ref()
    }

    pub fn test(&self) -> bool {
        self.test
    }

    pub fn json(&self) -> Option<&PathBuf> {
        self.json.as_ref()
    }

    /// Root directory for file bodies: `--file-root`, else the script's
    /// directory.
    pub fn file_root(&self, script: &str) -> PathBuf {
        match &self.file_root {
            Some(root) => root.clone(),
            None => PathBuf::from(script)
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), PathBuf::from),
        }
    }

    /// Explicit `--color`/`--no-color`, else whether stdout is a terminal.
    pub fn use_color(&self) -> bool {
        self.color
            .unwrap_or_else(|| atty::is(atty::Stream::Stdout))
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            proxy: self.proxy.clone(),
            insecure: self.insecure,
            follow_location: self.location,
            user: self.user.clone(),
            connect_timeout: self
                .connect_timeout
                .map_or(config::DEFAULT_CONNECT_TIMEOUT, Duration::from_secs),
            max_time: self.max_time.map(Duration::from_secs),
            compressed: self.compressed,
        }
    }

    /// Initial variables: the properties file first, then each `--variable`
    /// in order, later definitions winning.
    pub fn variables(&self) -> Result<VariableStore> {
        let mut pairs: Vec<(String, String)> = Vec::new();
        if let Some(path) = &self.variables_file {
            let ini = Ini::load_from_file(path)
                .with_context(|| format!("Failed to read variables file {}", path.display()))?;
            for (_, properties) in ini.iter() {
                for (name, value) in properties.iter() {
                    pairs.push((name.to_string(), value.to_string()));
                }
            }
        }
        for definition in &self.variables {
            let Some((name, value)) = definition.split_once('=') else {
                bail!("Invalid variable '{definition}', expected NAME=VALUE");
            };
            if name.is_empty() {
                bail!("Invalid variable '{definition}', name is empty");
            }
            pairs.push((name.to_string(), value.to_string()));
        }
        Ok(VariableStore::from_strings(pairs))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::variables::Variable;
    use std::io::Write;

    #[test]
    fn test_parse_args_files_and_flags() {
        let args = CommandLineArgs::parse_from([
            "hurlite", "-v", "-L", "-k", "-i", "--test", "a.hurl", "b.hurl",
        ]);
        assert_eq!(args.files(), ["a.hurl", "b.hurl"]);
        assert!(args.verbose());
        assert!(args.include());
        assert!(args.test());
        let options = args.client_options();
        assert!(options.follow_location);
        assert!(options.insecure);
        assert!(!options.compressed);
    }

    #[test]
    fn test_parse_args_transport_options() {
        let args = CommandLineArgs::parse_from([
            "hurlite",
            "-x",
            "localhost:3128",
            "-u",
            "bob:secret",
            "--connect-timeout",
            "5",
            "-m",
            "30",
            "--compressed",
            "a.hurl",
        ]);
        let options = args.client_options();
        assert_eq!(options.proxy.as_deref(), Some("localhost:3128"));
        assert_eq!(options.user.as_deref(), Some("bob:secret"));
        assert_eq!(options.connect_timeout, Duration::from_secs(5));
        assert_eq!(options.max_time, Some(Duration::from_secs(30)));
        assert!(options.compressed);
    }

    #[test]
    fn test_default_values() {
        let args = CommandLineArgs::parse_from(["hurlite", "a.hurl"]);
        assert_eq!(args.to_entry(), None);
        assert!(args.output().is_none());
        assert!(args.json().is_none());
        assert_eq!(
            args.client_options().connect_timeout,
            config::DEFAULT_CONNECT_TIMEOUT
        );
        assert!(args.variables().unwrap().is_empty());
    }

    #[test]
    fn test_parse_args_color_flags() {
        assert!(CommandLineArgs::parse_from(["hurlite", "--color"]).use_color());
        assert!(!CommandLineArgs::parse_from(["hurlite", "--no-color"]).use_color());
        assert!(!CommandLineArgs::parse_from(["hurlite", "--color", "--no-color"]).use_color());
    }

    #[test]
    fn test_parse_args_variables_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "host=http://localhost:8000").unwrap();
        writeln!(file, "user=alice").unwrap();

        let path = file.path().to_string_lossy().to_string();
        let args = CommandLineArgs::parse_from([
            "hurlite",
            "--variables-file",
            path.as_str(),
            "--variable",
            "user=bob",
            "--variable",
            "token=a=b",
        ]);
        let variables = args.variables().unwrap();
        assert_eq!(
            variables.get("host"),
            Some(&Variable::String("http://localhost:8000".to_string()))
        );
        assert_eq!(variables.get("user"), Some(&Variable::String("bob".to_string())));
        assert_eq!(variables.get("token"), Some(&Variable::String("a=b".to_string())));
    }

    #[test]
    fn test_parse_args_invalid_variable() {
        let args = CommandLineArgs::parse_from(["hurlite", "--variable", "novalue"]);
        assert!(args.variables().is_err());
    }

    #[test]
    fn test_file_root_defaults_to_script_directory() {
        let args = CommandLineArgs::parse_from(["hurlite"]);
        assert_eq!(args.file_root("tests/api.hurl"), PathBuf::from("tests"));
        assert_eq!(args.file_root("api.hurl"), PathBuf::from("."));

        let args = CommandLineArgs::parse_from(["hurlite", "--file-root", "/data"]);
        assert_eq!(args.file_root("tests/api.hurl"), PathBuf::from("/data"));
    }

    #[test]
    fn test_parse_args_rejects_unknown_flag() {
        assert!(CommandLineArgs::try_parse_from(["hurlite", "--bogus"]).is_err());
    }
}
