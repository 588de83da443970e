//! Command-line and environment configuration.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;

/// Command-line arguments for pitchbox-server
#[derive(Parser, Debug)]
#[command(name = "pitchbox-server")]
#[command(about = "Audio-to-MIDI transcription service")]
#[command(version)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000", env = "PITCHBOX_PORT")]
    pub port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "PITCHBOX_BIND")]
    pub bind: IpAddr,

    /// Path to the Basic Pitch ONNX model file
    #[arg(short, long, default_value = "model/icassp_2022_nmp.onnx", env = "PITCHBOX_MODEL")]
    pub model_path: PathBuf,
}
