use std::path::PathBuf;

use clap::Parser;

use prvsat::attack::Schedule;
use prvsat::cli::{self,SolveArgs};
use prvsat::config::{self,FusedParams};

/// Recovers the secret state of the fused-output generator from its output.
#[derive(Debug, Parser)]
#[command(name = "fused_attack", version)]
struct Opts {
    /// JSON parameter file; missing keys keep their defaults
    #[arg(long)]
    config:Option<PathBuf>,

    #[arg(long)]
    width:Option<usize>,

    /// Number of attacked hash elements
    #[arg(long)]
    hci:Option<usize>,

    /// Hash array length
    #[arg(long)]
    hc:Option<usize>,

    /// Number of fused observations
    #[arg(long)]
    num_obs:Option<usize>,

    #[arg(long)]
    seed:Option<u64>,

    #[arg(long)]
    lcg:Option<u64>,

    #[arg(long, value_delimiter = ',')]
    hash:Option<Vec<u64>>,

    #[command(flatten)]
    solve:SolveArgs
}

impl Opts {
    fn params(&self)->prvsat::Result<FusedParams> {
	let mut p:FusedParams = match &self.config {
	    Some(path) => config::load(path)?,
	    None => FusedParams::default()
	};
	if let Some(x) = self.width { p.width = x; }
	if let Some(x) = self.hci { p.hci = x; }
	if let Some(x) = self.hc { p.hc = x; }
	if let Some(x) = self.num_obs { p.num_obs = x; }
	if let Some(x) = self.seed { p.seed = x; }
	if let Some(x) = self.lcg { p.lcg = x; }
	if let Some(x) = &self.hash { p.hash = x.clone(); }
	Ok(p)
    }
}

fn main()->Result<(),Box<dyn std::error::Error>> {
    cli::init_tracing();
    let opts = Opts::parse();
    let p = opts.params()?;
    cli::run(Schedule::Fused(p),&opts.solve)?;
    Ok(())
}
