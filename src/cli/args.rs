//! Command-line interface definitions.

use clap::{ColorChoice, Parser, Subcommand};
use std::net::IpAddr;
use std::path::PathBuf;

/// Render server-built application bundles and generate static sites
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Config file path (default: rendition.toml)
    #[arg(short = 'C', long, global = true, default_value = "rendition.toml", value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Pre-render every route into a static site
    #[command(visible_alias = "g")]
    Generate {
        #[command(flatten)]
        args: GenerateArgs,
    },

    /// Render routes on demand over HTTP
    #[command(visible_alias = "s")]
    Serve {
        /// Network interface to bind (e.g., 127.0.0.1, 0.0.0.0)
        #[arg(short, long)]
        interface: Option<IpAddr>,

        /// Port number to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Reload resources when the build output changes
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        watch: Option<bool>,

        /// Development mode: `'unsafe-eval'` in CSP, longer readiness wait, loading page
        #[arg(short, long)]
        dev: bool,
    },

    /// Render one route and print the HTML to stdout
    #[command(visible_alias = "r")]
    Render {
        /// Route to render, e.g. `/about`
        url: String,

        /// Render the SPA shell instead of server markup
        #[arg(long)]
        spa: bool,

        /// Force modern (`true`) or legacy (`false`) bundles
        #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        modern: Option<bool>,
    },
}

/// Generate command arguments.
#[derive(clap::Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Output directory (relative to project root)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub dir: Option<PathBuf>,

    /// Routes rendered per batch
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Milliseconds between renders of one batch
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// Follow links found in rendered pages
    #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub crawler: Option<bool>,

    /// Minify the HTML content
    #[arg(short, long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
    pub minify: Option<bool>,

    /// Exit with an error status when a route failed to render
    #[arg(long)]
    pub fail_on_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate() {
        let cli = Cli::parse_from([
            "rendition", "-C", "site.toml", "generate", "--concurrency", "8", "--crawler=false",
            "--fail-on-error",
        ]);
        assert_eq!(cli.config, PathBuf::from("site.toml"));
        let Commands::Generate { args } = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.concurrency, Some(8));
        assert_eq!(args.crawler, Some(false));
        assert_eq!(args.minify, None);
        assert!(args.fail_on_error);
    }

    #[test]
    fn test_parse_serve_and_render() {
        let cli = Cli::parse_from(["rendition", "serve", "-p", "8080", "--watch", "--dev"]);
        let Commands::Serve { port, watch, dev, interface } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(port, Some(8080));
        assert_eq!(watch, Some(true));
        assert!(dev);
        assert!(interface.is_none());

        let cli = Cli::parse_from(["rendition", "render", "/about", "--spa", "--verbose"]);
        assert!(cli.verbose);
        let Commands::Render { url, spa, modern } = cli.command else {
            panic!("expected render");
        };
        assert_eq!(url, "/about");
        assert!(spa);
        assert_eq!(modern, None);
    }
}
