//! Node startup arguments: `<port>`, `log=<level>`, `config=<file>`, `-gdb`, `-version`.

use std::path::PathBuf;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct NodeArgs {
    /// RPC port; omitted or negative selects the mode default
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub config_file: Option<PathBuf>,
    pub debug: bool,
    /// Arguments that matched nothing above
    pub ignored: Vec<String>,
}

/// True when `-version` appears anywhere, regardless of the other arguments.
pub fn wants_version<I, S>(args: I) -> bool
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    args.into_iter().any(|arg| arg.as_ref() == "-version")
}

impl NodeArgs {
    pub fn parse<I, S>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = NodeArgs::default();
        for arg in args.into_iter().map(Into::into) {
            if arg == "-version" {
                // handled by `wants_version` before parsing
                continue;
            } else if arg == "-gdb" {
                parsed.debug = true;
            } else if let Some(level) = arg.strip_prefix("log=") {
                parsed.log_level = Some(level.to_string());
            } else if let Some(path) = arg.strip_prefix("config=") {
                parsed.config_file = Some(PathBuf::from(path));
            } else if let Ok(port) = arg.parse::<i64>() {
                parsed.port = if port < 0 {
                    None
                } else {
                    Some(u16::try_from(port).map_err(|_| {
                        anyhow::anyhow!("port {} is out of range", port)
                    })?)
                };
            } else {
                parsed.ignored.push(arg);
            }
        }
        Ok(parsed)
    }
}
