//! Subcommand definitions.

use clap::Subcommand;
use url::Url;

use bgdl_core::DownloadPolicy;

/// A request header given as `NAME:VALUE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderArg {
    pub name: String,
    pub value: String,
}

/// Parse `NAME:VALUE`; the value may itself contain colons.
pub fn parse_header(raw: &str) -> Result<HeaderArg, String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected NAME:VALUE, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err("header name cannot be empty".to_string());
    }
    Ok(HeaderArg {
        name: name.to_string(),
        value: value.trim_start().to_string(),
    })
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a background download
    Start {
        /// Source URL
        url: Url,
        /// Destination path relative to the data directory
        file_path: String,
        /// Network policy (default, unrestricted-only, allow-metered, always-allow)
        #[arg(long, default_value = "default")]
        policy: DownloadPolicy,
        /// Extra request header as NAME:VALUE (repeatable)
        #[arg(short = 'H', long = "header", value_parser = parse_header)]
        headers: Vec<HeaderArg>,
        /// Stay attached and show progress until the download finishes
        #[arg(short, long)]
        wait: bool,
    },

    /// List tracked downloads
    ///
    /// Transfers run only while a bgdl process is alive. Querying their
    /// status resumes unfinished ones until `list` exits; use `wait` to
    /// carry them to completion.
    List,

    /// Wait for a download to finish, then stop tracking it
    Wait {
        /// Destination path of the download
        file_path: String,
    },

    /// Cancel a download and stop tracking it
    Cancel {
        /// Destination path of the download
        file_path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cli;
    use clap::Parser;

    #[test]
    fn test_header_parsing() {
        let header = parse_header("Authorization: Bearer a:b").unwrap();
        assert_eq!(header.name, "Authorization");
        assert_eq!(header.value, "Bearer a:b");

        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(" :value").is_err());
    }

    #[test]
    fn test_start_arguments() {
        let cli = Cli::parse_from([
            "bgdl",
            "start",
            "https://example.test/a.bin",
            "dir/a.bin",
            "--policy",
            "unrestricted-only",
            "-H",
            "X-A:1",
            "-H",
            "X-A:2",
            "--wait",
        ]);
        let Commands::Start {
            url,
            file_path,
            policy,
            headers,
            wait,
        } = cli.command
        else {
            panic!("expected start");
        };
        assert_eq!(url.as_str(), "https://example.test/a.bin");
        assert_eq!(file_path, "dir/a.bin");
        assert_eq!(policy, DownloadPolicy::UnrestrictedOnly);
        assert_eq!(headers.len(), 2);
        assert!(wait);
    }

    #[test]
    fn test_invalid_policy_is_rejected() {
        let result = Cli::try_parse_from([
            "bgdl",
            "start",
            "https://example.test/a.bin",
            "a.bin",
            "--policy",
            "sometimes",
        ]);
        assert!(result.is_err());
    }
}
