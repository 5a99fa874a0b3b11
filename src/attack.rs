use std::fmt;
use std::path::Path;
use std::time::{Duration,Instant};

use serde::{Deserialize,Serialize};
use tracing::{debug,info};

use crate::config::{FusedParams,StreamParams};
use crate::error::{Error,Result};
use crate::machine::{Lowering,Machine,Valuation};
use crate::mixer::{mask,ConcreteEngine,Core,Engine,Firewall,SymbolicEngine};
use crate::register::Register;
use crate::solver::{Backend,ClauseSink,Dimacs,Outcome};

// Steps run on the first hash element before the round-robin starts.
const WARMUP : usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "variant", rename_all = "snake_case")]
pub enum Schedule {
    Fused(FusedParams),
    Stream(StreamParams)
}

impl Schedule {
    pub fn name(&self)->&'static str {
	match self {
	    Schedule::Fused(_) => "fused",
	    Schedule::Stream(_) => "stream"
	}
    }

    pub fn width(&self)->usize {
	match self {
	    Schedule::Fused(p) => p.width,
	    Schedule::Stream(p) => p.width
	}
    }

    pub fn validate(&self)->Result<()> {
	match self {
	    Schedule::Fused(p) => p.validate(),
	    Schedule::Stream(p) => p.validate()
	}
    }

    /// Secret words, masked, in the order their unknowns are allocated.
    pub fn secrets(&self)->Vec<(String,u64)> {
	let m = mask(self.width());
	let mut v = Vec::new();
	let (hash,hci) = match self {
	    Schedule::Fused(p) => {
		v.push(("seed".to_string(),p.seed & m));
		v.push(("lcg".to_string(),p.lcg & m));
		(&p.hash,p.hci)
	    },
	    Schedule::Stream(p) => {
		v.push(("seed".to_string(),p.seed & m));
		(&p.hash,p.hci)
	    }
	};
	for (i,&h) in hash.iter().take(hci).enumerate() {
	    v.push((format!("hash[{}]",i),h & m));
	}
	v
    }

    /// Initial state with `unknowns` (as listed by `secrets`) in place and
    /// every other word zero.
    pub(crate) fn core<E:Engine>(&self,e:&mut E,unknowns:&[E::Word])->Core<E::Word> {
	let n = self.secrets().len();
	if unknowns.len() != n {
	    panic!("Schedule {} expects {} unknowns, got {}",self.name(),n,unknowns.len());
	}
	let (hci,hc) = match self {
	    Schedule::Fused(p) => (p.hci,p.hc),
	    Schedule::Stream(p) => (p.hci,p.hc)
	};
	let seed = unknowns[0].clone();
	let (lcg,off) = match self {
	    Schedule::Fused(_) => (unknowns[1].clone(),2),
	    Schedule::Stream(_) => (e.constant(0),1)
	};
	let hash = (0..hc).map(|i| if i < hci { unknowns[off + i].clone() } else { e.constant(0) }).collect();
	Core::new(seed,lcg,hash)
    }

    /// Drives `core` through the schedule and returns the observable words.
    pub fn observe<E:Engine>(&self,e:&mut E,mut core:Core<E::Word>)->Vec<E::Word> {
	for _ in 0..WARMUP {
	    core.mix(e);
	}
	match self {
	    Schedule::Fused(p) => {
		for _ in 0..p.hc + 1 {
		    core.next(e);
		}
		(0..p.num_obs).map(|_| {
		    let out1 = core.next(e);
		    let out2 = core.next(e);
		    e.xor(&out1,&out2)
		}).collect()
	    },
	    Schedule::Stream(p) => {
		let mut iv = p.iv.iter();
		for i in 0..p.hc {
		    if i & 1 == 1 {
			if let Some(&w) = iv.next() {
			    let w = e.constant(w);
			    core.inject(e,&w);
			}
		    }
		    core.next(e);
		}
		for _ in 0..p.hc + 1 {
		    core.next(e);
		}
		let mut fw = Firewall::new(e);
		let mut obs = Vec::with_capacity(4 * p.num_obs);
		for r in 0..p.fc + p.num_obs {
		    let out = core.next(e);
		    fw.feed(e,&out);
		    let outs = fw.round(e);
		    if r >= p.fc {
			obs.extend(outs);
		    }
		}
		obs
	    }
	}
    }

    /// Concrete run from the given secret words.
    pub(crate) fn replay(&self,values:&[u64])->Vec<u64> {
	let mut e = ConcreteEngine::new(self.width());
	let words:Vec<u64> = values.iter().map(|&v| e.constant(v)).collect();
	let core = self.core(&mut e,&words);
	self.observe(&mut e,core)
    }
}

pub struct Attack {
    schedule:Schedule
}

impl Attack {
    pub fn new(schedule:Schedule)->Result<Self> {
	schedule.validate()?;
	Ok(Attack{ schedule })
    }

    pub fn observations(&self)->Vec<u64> {
	let secrets:Vec<u64> = self.schedule.secrets().into_iter().map(|(_,v)| v).collect();
	self.schedule.replay(&secrets)
    }

    pub fn build(&self)->Instance {
	let width = self.schedule.width();
	info!(variant = self.schedule.name(),width,"building constraint network");

	let observations = self.observations();

	let mut se = SymbolicEngine::new(width);
	let secrets = self.schedule.secrets();
	let regs:Vec<Register> = secrets.iter().map(|_| se.fresh()).collect();
	let core = self.schedule.core(&mut se,&regs);
	let sym = self.schedule.observe(&mut se,core);
	debug_assert_eq!(sym.len(),observations.len());

	let mut mac = se.into_machine();
	for (r,&o) in sym.iter().zip(observations.iter()) {
	    let c = r.constraints(o);
	    mac.assert_bits(&c);
	}
	debug!(gates = mac.len(),inputs = mac.num_inputs(),adders = mac.num_adders(),
	       assertions = mac.assertions().len(),observations = observations.len(),
	       "constraint network ready");

	let unknowns = secrets.into_iter().zip(regs)
	    .map(|((name,actual),register)| Unknown{ name,register,actual })
	    .collect();
	Instance{ schedule:self.schedule.clone(),mac,unknowns,observations }
    }
}

#[derive(Debug, Clone)]
struct Unknown {
    name:String,
    register:Register,
    actual:u64
}

pub struct Instance {
    schedule:Schedule,
    mac:Machine,
    unknowns:Vec<Unknown>,
    observations:Vec<u64>
}

impl Instance {
    pub fn machine(&self)->&Machine {
	&self.mac
    }

    pub fn observations(&self)->&[u64] {
	&self.observations
    }

    /// The network evaluated with every unknown set to its true value.
    pub fn secret_valuation(&self)->Valuation {
	let pins:Vec<_> = self.unknowns.iter().flat_map(|u| u.register.constraints(u.actual)).collect();
	self.mac.eval(&pins)
    }

    pub fn solve<B:Backend>(&self,backend:&mut B)->Result<Report> {
	let lowering = self.lower(backend)?;
	info!(vars = lowering.vars,clauses = lowering.clauses,"solving");
	let t0 = Instant::now();
	let outcome = backend.solve()?;
	let solve_time = t0.elapsed();
	let model = match outcome {
	    Outcome::Unsat => {
		info!(?solve_time,"no assignment satisfies the observations");
		return Err(Error::Unsatisfiable);
	    },
	    Outcome::Sat(model) => model
	};
	if !lowering.covered_by(&model) {
	    return Err(Error::Backend(format!("model has only {} variables",model.len())));
	}
	let v = lowering.valuation(&model);
	let values:Vec<Recovered> = self.unknowns.iter().map(|u| Recovered{
	    name:u.name.clone(),
	    recovered:u.register.value(&v),
	    actual:u.actual
	}).collect();
	let stats = NetworkStats{
	    gates:self.mac.len(),
	    inputs:self.mac.num_inputs(),
	    assertions:self.mac.assertions().len(),
	    vars:lowering.vars,
	    clauses:lowering.clauses,
	    solve_time
	};
	let report = Report{ values,stats,schedule:self.schedule.clone(),lowering };
	info!(?solve_time,all_match = report.all_match(),"solved");
	Ok(report)
    }

    /// Excludes the recovered unknowns and solves again.  `backend` must be
    /// the one `report` was solved on, since the blocking clause refers to
    /// its variables.  True when the observations admit no other value of
    /// the unknowns.
    pub fn check_unique<B:Backend>(&self,backend:&mut B,report:&Report)->Result<bool> {
	if (backend.num_vars() as usize) < report.lowering.vars {
	    return Err(Error::Backend(format!("backend has {} variables, the solved network {}",
					      backend.num_vars(),report.lowering.vars)));
	}
	let mut block = Vec::new();
	for (u,r) in self.unknowns.iter().zip(report.values.iter()) {
	    for (i,&b) in u.register.bits().iter().enumerate() {
		let l = report.lowering.literal(b);
		block.push(if (r.recovered >> i) & 1 != 0 { !l } else { l });
	    }
	}
	backend.add_clause(&block)?;
	match backend.solve()? {
	    Outcome::Unsat => Ok(true),
	    Outcome::Sat(_) => Ok(false)
	}
    }

    /// Lowers into `sink` without solving.
    pub fn lower<S:ClauseSink>(&self,sink:&mut S)->Result<Lowering> {
	self.mac.lower(sink)
    }

    pub fn export<P:AsRef<Path>>(&self,cnf:P,map:Option<&Path>)->Result<Lowering> {
	let mut d = Dimacs::new();
	let lowering = self.lower(&mut d)?;
	d.save(cnf)?;
	if let Some(path) = map {
	    let regs:Vec<(String,&Register)> = self.unknowns.iter().map(|u| (u.name.clone(),&u.register)).collect();
	    Register::dump(path,&regs,&lowering)?;
	}
	info!(vars = lowering.vars,clauses = d.clauses().len(),"exported");
	Ok(lowering)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recovered {
    pub name:String,
    pub recovered:u64,
    pub actual:u64
}

impl Recovered {
    pub fn matches(&self)->bool {
	self.recovered == self.actual
    }
}

#[derive(Debug, Clone)]
pub struct NetworkStats {
    pub gates:usize,
    pub inputs:usize,
    pub assertions:usize,
    pub vars:usize,
    pub clauses:usize,
    pub solve_time:Duration
}

#[derive(Debug, Clone)]
pub struct Report {
    pub values:Vec<Recovered>,
    pub stats:NetworkStats,
    schedule:Schedule,
    lowering:Lowering
}

impl Report {
    pub fn all_match(&self)->bool {
	self.values.iter().all(|r| r.matches())
    }

    pub fn get(&self,name:&str)->Option<&Recovered> {
	self.values.iter().find(|r| r.name == name)
    }

    /// Observations the recovered values produce.
    pub fn replay(&self)->Vec<u64> {
	let values:Vec<u64> = self.values.iter().map(|r| r.recovered).collect();
	self.schedule.replay(&values)
    }
}

impl fmt::Display for Report {
    fn fmt(&self,f:&mut fmt::Formatter<'_>)->fmt::Result {
	for r in self.values.iter() {
	    writeln!(f,"{:<8} = {:4} ({:4}){}",r.name,r.recovered,r.actual,
		     if r.matches() { "" } else { " MISMATCH" })?;
	}
	write!(f,"{} gates, {} variables, {} clauses, solved in {:.3} s",
	       self.stats.gates,self.stats.vars,self.stats.clauses,
	       self.stats.solve_time.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::CryptoMiniSat;

    #[test]
    fn fused_secret_order() {
	let s = Schedule::Fused(FusedParams::default());
	let names:Vec<String> = s.secrets().into_iter().map(|(n,_)| n).collect();
	assert_eq!(names,["seed","lcg","hash[0]","hash[1]"]);
	assert_eq!(s.secrets()[2].1,13);
    }

    #[test]
    fn stream_secrets_are_masked() {
	let p = StreamParams{ width:4,seed:0x1f,..StreamParams::default() };
	let s = Schedule::Stream(p);
	let secrets = s.secrets();
	assert_eq!(secrets.len(),3);
	assert_eq!(secrets[0],("seed".to_string(),0xf));
	assert_eq!(secrets[2].1,14);
    }

    #[test]
    fn observation_counts() {
	let a = Attack::new(Schedule::Fused(FusedParams{ num_obs:7,..FusedParams::default() })).unwrap();
	assert_eq!(a.observations().len(),7);
	let b = Attack::new(Schedule::Stream(StreamParams{ num_obs:3,..StreamParams::default() })).unwrap();
	assert_eq!(b.observations().len(),12);
    }

    #[test]
    fn fused_schedule_by_hand() {
	let p = FusedParams{ hc:3,hci:2,num_obs:2,..FusedParams::default() };
	let mut e = ConcreteEngine::new(6);
	let mut core = Core::new(4,5,vec![13,4,0]);
	for _ in 0..5 {
	    core.mix(&mut e);
	}
	for _ in 0..4 {
	    core.next(&mut e);
	}
	let mut want = Vec::new();
	for _ in 0..2 {
	    let a = core.next(&mut e);
	    let b = core.next(&mut e);
	    want.push(a ^ b);
	}
	assert_eq!(Attack::new(Schedule::Fused(p)).unwrap().observations(),want);
    }

    #[test]
    fn stream_schedule_by_hand() {
	let p = StreamParams{ hc:8,fc:2,num_obs:2,..StreamParams::default() };
	let mut e = ConcreteEngine::new(6);
	let mut core = Core::new(4,0,vec![3,14,0,0,0,0,0,0]);
	for _ in 0..5 {
	    core.mix(&mut e);
	}
	for i in 0..8 {
	    match i {
		1 => core.inject(&mut e,&15),
		3 => core.inject(&mut e,&9),
		5 => core.inject(&mut e,&4),
		7 => core.inject(&mut e,&6),
		_ => ()
	    }
	    core.next(&mut e);
	}
	for _ in 0..9 {
	    core.next(&mut e);
	}
	let mut fw = Firewall::new(&mut e);
	for _ in 0..2 {
	    let out = core.next(&mut e);
	    fw.feed(&mut e,&out);
	    fw.round(&mut e);
	}
	let mut want = Vec::new();
	for _ in 0..2 {
	    let out = core.next(&mut e);
	    fw.feed(&mut e,&out);
	    want.extend(fw.round(&mut e));
	}
	assert_eq!(want,[51,51,13,35,18,4,8,19]);
	assert_eq!(Attack::new(Schedule::Stream(p)).unwrap().observations(),want);
    }

    #[test]
    fn stream_nonce_runs_out() {
	let p = StreamParams{ hc:8,fc:2,num_obs:2,iv:vec![15,9],..StreamParams::default() };
	assert_eq!(Attack::new(Schedule::Stream(p)).unwrap().observations(),[51,51,59,23,18,22,46,24]);
    }

    #[test]
    fn stream_reference_keystream() {
	let obs = Attack::new(Schedule::Stream(StreamParams::default())).unwrap().observations();
	assert_eq!(obs.len(),64);
	assert_eq!(obs[..8],[5,26,4,7,39,28,37,13]);
    }

    #[test]
    #[should_panic(expected = "expects 4 unknowns")]
    fn short_unknowns_rejected() {
	let s = Schedule::Fused(FusedParams::default());
	s.replay(&[4,5,13]);
    }

    #[test]
    fn contradictory_network_is_unsatisfiable() {
	let mut inst = Attack::new(Schedule::Fused(FusedParams{ num_obs:2,..FusedParams::default() })).unwrap().build();
	let (i,b) = inst.mac.assertions()[0];
	inst.mac.assert_bits(&[(i,!b)]);
	assert!(matches!(inst.solve(&mut CryptoMiniSat::new()),Err(Error::Unsatisfiable)));
    }

    #[test]
    fn uniqueness_needs_the_solving_backend() {
	let inst = Attack::new(Schedule::Fused(FusedParams{ num_obs:2,..FusedParams::default() })).unwrap().build();
	let mut solver = CryptoMiniSat::new();
	let report = inst.solve(&mut solver).unwrap();
	assert!(matches!(inst.check_unique(&mut CryptoMiniSat::new(),&report),Err(Error::Backend(_))));
	assert!(!inst.check_unique(&mut solver,&report).unwrap());
    }

    #[test]
    fn invalid_schedule_rejected() {
	let p = FusedParams{ width:5,..FusedParams::default() };
	assert!(matches!(Attack::new(Schedule::Fused(p)),Err(Error::Config(_))));
    }

    #[test]
    fn symbolic_run_satisfies_bindings() {
	for s in [Schedule::Fused(FusedParams{ num_obs:8,..FusedParams::default() }),
		  Schedule::Stream(StreamParams{ num_obs:4,..StreamParams::default() })] {
	    let inst = Attack::new(s).unwrap().build();
	    assert!(inst.machine().satisfied(&inst.secret_valuation()));
	}
    }

    #[test]
    fn schedule_file_is_tagged() {
	let s:Schedule = serde_json::from_str(r#"{ "variant": "stream", "num_obs": 2 }"#).unwrap();
	match s {
	    Schedule::Stream(p) => {
		assert_eq!(p.num_obs,2);
		assert_eq!(p.hc,16);
	    },
	    _ => panic!("wrong variant")
	}
    }
}
