use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Guided five-direction face enrollment", long_about = None)]
pub struct Args {
    /// Directory of frames, processed in file-name order as one stream
    #[arg(short, long)]
    pub frames: PathBuf,

    /// Config file (created with defaults if missing)
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Capture directory (overrides `output_dir` from the config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write every annotated frame to this directory
    #[arg(long)]
    pub annotated: Option<PathBuf>,

    /// Do not mirror frames before analysis
    #[arg(long, default_value_t = false)]
    pub no_mirror: bool,

    #[arg(long, default_value = "")]
    pub fullname: String,

    #[arg(long, default_value = "")]
    pub employee_id: String,

    #[arg(long, default_value = "")]
    pub email: String,

    #[arg(long, default_value = "")]
    pub department: String,
}
