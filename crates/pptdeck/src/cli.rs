use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pptdeck")]
#[command(author, version, about)]
#[command(long_about = "A JSON-driven slide presentation viewer and authoring tool.\n\n\
    Each presentation is a folder with a slides.config.json and one HTML file per slide.\n\n\
    Examples:\n  \
    pptdeck present demo                  Present the \"demo\" group (fullscreen)\n  \
    pptdeck present demo --slide 3 -w     Start on slide 3 in a window\n  \
    pptdeck present --home                Pick a presentation from a list\n  \
    pptdeck serve                         Run the local authoring server\n  \
    pptdeck slides add demo intro.html    Add a slide to \"demo\"")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase output verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Open a presentation in the viewer
    Present {
        /// Presentation group (defaults to site.default_group)
        group: Option<String>,

        /// Start on a specific slide (1-indexed)
        #[arg(long)]
        slide: Option<usize>,

        /// Open a deep link such as http://localhost:5173/demo?slide=3
        #[arg(long, conflicts_with_all = ["group", "slide"])]
        link: Option<String>,

        /// Start on the list of presentations
        #[arg(long)]
        home: bool,

        /// Launch in a window instead of fullscreen
        #[arg(short, long)]
        windowed: bool,
    },

    /// Run the local authoring server
    Serve {
        /// Project root holding presentations/ and public/templates/
        #[arg(long)]
        root: Option<PathBuf>,

        /// Port to listen on (the next free one is used if taken)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Built site to serve for all other paths
        #[arg(long)]
        site: Option<PathBuf>,
    },

    /// Create a new presentation folder
    New {
        /// Group name (letters, digits, '-' and '_')
        group: String,

        /// Presentation title
        #[arg(long)]
        title: Option<String>,

        /// Presentation description
        #[arg(long)]
        description: Option<String>,

        /// Project root (defaults to server.root)
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Edit the slides of a local presentation
    Slides {
        /// Project root (defaults to server.root)
        #[arg(long, global = true)]
        root: Option<PathBuf>,

        #[command(subcommand)]
        command: SlidesCommands,
    },

    /// Sign in to the presentation backend
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },

    /// Manage presentation records on the backend
    Records {
        #[command(subcommand)]
        command: RecordsCommands,
    },

    /// Copy presentations into a built site for static hosting
    Export {
        /// Built site directory
        #[arg(long, default_value = "dist")]
        dist: PathBuf,

        /// Presentations directory to copy
        #[arg(long, default_value = "presentations")]
        presentations: PathBuf,
    },

    /// Print the deep link for a slide
    Link {
        /// Presentation group
        group: String,

        /// Slide number (1-indexed)
        #[arg(long, default_value = "1")]
        slide: usize,
    },

    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum SlidesCommands {
    /// List the slides of a presentation
    List {
        /// Presentation group
        group: String,
    },

    /// Create a slide from a template
    Add {
        /// Presentation group
        group: String,

        /// Slide file name, ending in .html
        file: String,

        /// Slide title
        #[arg(long)]
        title: Option<String>,

        /// Template name under public/templates
        #[arg(long)]
        template: Option<String>,
    },

    /// Copy a slide and insert it after the original
    Duplicate {
        /// Presentation group
        group: String,

        /// Slide file to copy
        file: String,

        /// Title of the copy's source (defaults to the config's title)
        #[arg(long)]
        title: Option<String>,
    },

    /// Move a slide to another position
    Reorder {
        /// Presentation group
        group: String,

        /// Current position (1-indexed)
        from: i64,

        /// New position (1-indexed)
        to: i64,
    },

    /// Delete a slide and its file
    Remove {
        /// Presentation group
        group: String,

        /// Slide file to delete
        #[arg(required_unless_present = "id")]
        file: Option<String>,

        /// Delete by slide id instead of file
        #[arg(long)]
        id: Option<String>,
    },

    /// Overwrite a slide's HTML
    Save {
        /// Presentation group
        group: String,

        /// Slide file name
        file: String,

        /// HTML source file ('-' for stdin)
        #[arg(long, default_value = "-")]
        from: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum AuthCommands {
    /// Sign in with email and password
    Login {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Create an account (captcha and email code are prompted)
    Register {
        /// Account email (prompted if omitted)
        #[arg(long)]
        email: Option<String>,
    },

    /// Sign out and forget the stored session
    Logout,

    /// Show the signed-in user
    Status,

    /// Exchange the refresh token for a new access token
    Refresh,
}

#[derive(Subcommand)]
pub enum RecordsCommands {
    /// List records
    List {
        /// Search text
        #[arg(long)]
        q: Option<String>,

        /// Only records with this tag
        #[arg(long)]
        tag: Option<String>,

        /// Sort order
        #[arg(long, default_value = crate::records::DEFAULT_SORT)]
        sort: String,

        #[arg(long)]
        limit: Option<u32>,

        #[arg(long)]
        offset: Option<u32>,
    },

    /// Show one record
    Get { id: i64 },

    /// Create a record
    Create {
        /// Presentation name (its group folder)
        name: String,

        #[command(flatten)]
        fields: RecordFields,
    },

    /// Update a record
    Update {
        id: i64,

        /// Presentation name (its group folder)
        #[arg(long)]
        name: String,

        #[command(flatten)]
        fields: RecordFields,
    },

    /// Delete a record
    Delete {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List every tag in use
    Tags,
}

#[derive(clap::Args)]
pub struct RecordFields {
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Tag (repeatable)
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. api.base_url, site.url, server.port)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        use crate::commands;

        match self.command {
            Some(Commands::Present {
                group,
                slide,
                link,
                home,
                windowed,
            }) => commands::present::run(commands::present::PresentArgs {
                group,
                slide,
                link,
                home,
                windowed,
            }),
            Some(Commands::Serve {
                root,
                port,
                host,
                site,
            }) => commands::serve::run(root, host, port, site),
            Some(Commands::New {
                group,
                title,
                description,
                root,
            }) => commands::new::run(&group, title, description, root),
            Some(Commands::Slides { root, command }) => commands::slides::run(root, command),
            Some(Commands::Auth { command }) => commands::auth::run(command),
            Some(Commands::Records { command }) => commands::records::run(command),
            Some(Commands::Export {
                dist,
                presentations,
            }) => commands::export::run(&dist, &presentations),
            Some(Commands::Link { group, slide }) => commands::link::run(&group, slide),
            Some(Commands::Config { command }) => commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                println!("pptdeck {}", env!("CARGO_PKG_VERSION"));
                Ok(())
            }
            None => {
                use clap::CommandFactory;
                let mut cmd = Self::command();
                cmd.print_help()?;
                println!();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_present_link_conflicts_with_group() {
        let err = Cli::try_parse_from(["pptdeck", "present", "demo", "--link", "/x?slide=2"]);
        assert!(err.is_err());

        let cli = Cli::try_parse_from(["pptdeck", "-vv", "present", "demo", "--slide", "3", "-w"])
            .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Present {
                group,
                slide,
                windowed,
                ..
            }) => {
                assert_eq!(group.as_deref(), Some("demo"));
                assert_eq!(slide, Some(3));
                assert!(windowed);
            }
            _ => panic!("expected present"),
        }
    }

    #[test]
    fn test_slides_remove_needs_file_or_id() {
        assert!(Cli::try_parse_from(["pptdeck", "slides", "remove", "demo"]).is_err());
        assert!(Cli::try_parse_from(["pptdeck", "slides", "remove", "demo", "--id", "s1"]).is_ok());
        assert!(Cli::try_parse_from(["pptdeck", "slides", "remove", "demo", "a.html"]).is_ok());
    }

    #[test]
    fn test_record_tags_repeat() {
        let cli = Cli::try_parse_from([
            "pptdeck", "records", "create", "q3", "--tag", "finance", "--tag", "2024",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Records {
                command: RecordsCommands::Create { name, fields },
            }) => {
                assert_eq!(name, "q3");
                assert_eq!(fields.tags, vec!["finance", "2024"]);
            }
            _ => panic!("expected records create"),
        }
    }
}
