use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Host a drawing program inside a click-through desktop background window"
)]
pub struct Args {
    /// Window geometry (e.g. 1920x1080+0+0); defaults to the full screen
    #[arg(short = 'g', long = "geometry", value_name = "WxH+X+Y")]
    pub geometry: Option<String>,

    /// Child command, given after `--`; the literal token WID is replaced
    /// with the window handle
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_requires_separator() {
        assert!(Args::try_parse_from(["underlay", "mpv", "file.mp4"]).is_err());
    }

    #[test]
    fn test_geometry_and_command() {
        let args =
            Args::try_parse_from(["underlay", "-g", "800x600+0+0", "--", "echo", "WID"]).unwrap();
        assert_eq!(args.geometry.as_deref(), Some("800x600+0+0"));
        assert_eq!(args.command, ["echo", "WID"]);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["underlay", "-q", "--", "echo"]).is_err());
    }

    #[test]
    fn test_no_command_parses_empty() {
        let args = Args::try_parse_from(["underlay"]).unwrap();
        assert!(args.command.is_empty());
    }
}
