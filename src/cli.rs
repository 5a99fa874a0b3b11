use std::path::PathBuf;

use clap::Args;
use tracing::{info,warn};
use tracing_subscriber::EnvFilter;

use crate::attack::{Attack,Schedule};
use crate::error::Result;
use crate::solver::CryptoMiniSat;

/// Options shared by the attack binaries.
#[derive(Debug, Clone, Args)]
pub struct SolveArgs {
    /// Solver threads
    #[arg(long, default_value_t = 1)]
    pub threads:u32,

    /// Solver verbosity
    #[arg(long, default_value_t = 0)]
    pub verbose:u32,

    /// Write the CNF to this file instead of solving
    #[arg(long)]
    pub dimacs:Option<PathBuf>,

    /// With --dimacs, also write the variable map of every unknown
    #[arg(long, requires = "dimacs")]
    pub map:Option<PathBuf>,

    /// After solving, check that no other assignment of the unknowns fits
    #[arg(long)]
    pub check_unique:bool
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
	.with_env_filter(filter)
	.with_writer(std::io::stderr)
	.init();
}

pub fn run(schedule:Schedule,args:&SolveArgs)->Result<()> {
    let attack = Attack::new(schedule)?;
    let inst = attack.build();

    if let Some(cnf) = &args.dimacs {
	let lowering = inst.export(cnf,args.map.as_deref())?;
	println!("wrote {} ({} variables, {} clauses)",cnf.display(),lowering.vars,lowering.clauses);
	return Ok(());
    }

    let mut solver = CryptoMiniSat::new()
	.with_threads(args.threads)
	.with_verbosity(args.verbose);
    let report = inst.solve(&mut solver)?;
    println!("{}",report);

    if report.replay() == inst.observations() {
	println!("recovered state reproduces all {} observations",inst.observations().len());
    } else {
	warn!("recovered state does not reproduce the observations");
    }

    if args.check_unique {
	if inst.check_unique(&mut solver,&report)? {
	    println!("solution is unique");
	} else {
	    println!("observations admit another solution");
	}
    }

    info!(all_match = report.all_match(),"done");
    Ok(())
}
