use std::path::{Path, PathBuf};

use crate::data::{read_significant_lines, LoadError};

/// Parsed global configuration file.
///
/// Line-oriented `KEY value` pairs; `#` starts a comment. Input file names
/// are resolved against INPUTDIR, output file names against OUTPUTDIR.
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    pub systemname: String,
    pub topologyfile: PathBuf,
    pub actionsfile: PathBuf,
    pub pricefile: PathBuf,
    pub inflowfile: PathBuf,
    pub start_statefile: PathBuf,
    pub outputfile: PathBuf,
    pub out_statefile: Option<PathBuf>,
    pub outputdir: PathBuf,
    pub inputdir: PathBuf,
    /// Timestep length in seconds.
    pub dt: u64,
    pub write_nodefiles: bool,
}

impl GlobalConfig {
    pub fn read(path: &Path) -> Result<GlobalConfig, LoadError> {
        let file = path.display().to_string();

        let mut systemname = None;
        let mut topologyfile = None;
        let mut actionsfile = None;
        let mut pricefile = None;
        let mut inflowfile = None;
        let mut start_statefile = None;
        let mut outputfile = None;
        let mut out_statefile: Option<String> = None;
        let mut outputdir = PathBuf::new();
        let mut inputdir = PathBuf::new();
        let mut dt = None;
        let mut write_nodefiles = false;

        for (line_no, line) in read_significant_lines(path)? {
            let mut tokens = line.split_whitespace();
            let (Some(key), Some(value)) = (tokens.next(), tokens.next()) else {
                return Err(LoadError::format(
                    &file,
                    line_no,
                    "expected 'KEY value'",
                ));
            };

            match key {
                "ACTIONFILE" => actionsfile = Some(value.to_string()),
                "INFLOWFILE" => inflowfile = Some(value.to_string()),
                "PRICEFILE" => pricefile = Some(value.to_string()),
                "TOPOLOGYFILE" => topologyfile = Some(value.to_string()),
                "STARTSTATEFILE" => start_statefile = Some(value.to_string()),
                "OUTPUTFILE" => outputfile = Some(value.to_string()),
                "OUTSTATEFILE" => out_statefile = Some(value.to_string()),
                "SYSTEMNAME" => systemname = Some(value.to_string()),
                "OUTPUTDIR" => outputdir = PathBuf::from(value),
                "INPUTDIR" => inputdir = PathBuf::from(value),
                "WRITE_NODEFILES" => {
                    write_nodefiles = value
                        .parse::<i64>()
                        .map_err(|_| {
                            LoadError::format(&file, line_no, "WRITE_NODEFILES must be 0 or 1")
                        })?
                        != 0;
                }
                "DT" => {
                    let v = value.parse::<u64>().map_err(|_| {
                        LoadError::format(&file, line_no, "DT must be a positive integer")
                    })?;
                    if v < 1 {
                        return Err(LoadError::format(&file, line_no, "DT must be >= 1 second"));
                    }
                    dt = Some(v);
                }
                // Unknown keys are ignored so config files can carry extra
                // annotations for other tools.
                _ => {}
            }
        }

        let require = |value: Option<String>, key: &str| {
            value.ok_or_else(|| LoadError::format(&file, 0, format!("missing required key {}", key)))
        };

        let topologyfile = require(topologyfile, "TOPOLOGYFILE")?;
        let actionsfile = require(actionsfile, "ACTIONFILE")?;
        let pricefile = require(pricefile, "PRICEFILE")?;
        let inflowfile = require(inflowfile, "INFLOWFILE")?;
        let start_statefile = require(start_statefile, "STARTSTATEFILE")?;
        let outputfile = require(outputfile, "OUTPUTFILE")?;
        let systemname = require(systemname, "SYSTEMNAME")?;
        let dt =
            dt.ok_or_else(|| LoadError::format(&file, 0, "missing required key DT"))?;

        Ok(GlobalConfig {
            systemname,
            topologyfile: inputdir.join(topologyfile),
            actionsfile: inputdir.join(actionsfile),
            pricefile: inputdir.join(pricefile),
            inflowfile: inputdir.join(inflowfile),
            start_statefile: inputdir.join(start_statefile),
            outputfile: outputdir.join(outputfile),
            out_statefile: out_statefile.map(|f| outputdir.join(f)),
            outputdir,
            inputdir,
            dt,
            write_nodefiles,
        })
    }
}
