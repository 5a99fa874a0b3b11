use std::fs::File;
use std::io::{BufWriter,Write};
use std::path::Path;

use cryptominisat::{Lbool,Lit,Solver};
use tracing::debug;

use crate::error::{Error,Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    var:u32,
    neg:bool
}

impl Literal {
    pub fn new(var:u32,neg:bool)->Self {
	Literal{ var,neg }
    }

    pub fn positive(var:u32)->Self {
	Self::new(var,false)
    }

    pub fn var(self)->u32 {
	self.var
    }

    pub fn value(self,model:&[bool])->bool {
	model[self.var as usize] != self.neg
    }

    pub fn to_dimacs(self)->i64 {
	let v = self.var as i64 + 1;
	if self.neg { -v } else { v }
    }
}

impl std::ops::Not for Literal {
    type Output = Literal;

    fn not(self)->Literal {
	Literal{ var:self.var,neg:!self.neg }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Sat(Vec<bool>),
    Unsat
}

pub trait ClauseSink {
    fn new_var(&mut self)->u32;
    fn num_vars(&self)->u32;
    fn add_clause(&mut self,lits:&[Literal])->Result<()>;

    /// Constrains the XOR of `lits` to `rhs`.  The default expansion emits
    /// one clause per assignment of the wrong parity.
    fn add_xor(&mut self,lits:&[Literal],rhs:bool)->Result<()> {
	let n = lits.len();
	for m in 0..(1_u64 << n) {
	    if (m.count_ones() & 1 != 0) != rhs {
		let c:Vec<Literal> = lits.iter().enumerate()
		    .map(|(i,&l)| if (m >> i) & 1 != 0 { !l } else { l })
		    .collect();
		self.add_clause(&c)?;
	    }
	}
	Ok(())
    }
}

pub trait Backend : ClauseSink {
    fn solve(&mut self)->Result<Outcome>;
}

pub struct CryptoMiniSat {
    solver:Solver,
    nvars:u32
}

impl Default for CryptoMiniSat {
    fn default()->Self {
	Self::new()
    }
}

impl CryptoMiniSat {
    pub fn new()->Self {
	CryptoMiniSat{ solver:Solver::new(),nvars:0 }
    }

    // Must be called before any variable is created.
    pub fn with_threads(mut self,n:u32)->Self {
	self.solver.set_num_threads(n.max(1));
	self
    }

    pub fn with_verbosity(mut self,v:u32)->Self {
	self.solver.set_verbosity(v);
	self
    }

    fn lits(lits:&[Literal])->Result<Vec<Lit>> {
	lits.iter()
	    .map(|l| Lit::new(l.var,l.neg)
		 .ok_or_else(|| Error::Backend(format!("variable {} out of range",l.var))))
	    .collect()
    }
}

impl ClauseSink for CryptoMiniSat {
    fn new_var(&mut self)->u32 {
	let _ = self.solver.new_var();
	self.nvars += 1;
	self.nvars - 1
    }

    fn num_vars(&self)->u32 {
	self.nvars
    }

    // A false return only means the formula became trivially UNSAT, which
    // `solve` reports.
    fn add_clause(&mut self,lits:&[Literal])->Result<()> {
	let c = Self::lits(lits)?;
	self.solver.add_clause(&c);
	Ok(())
    }

    fn add_xor(&mut self,lits:&[Literal],rhs:bool)->Result<()> {
	let c = Self::lits(lits)?;
	self.solver.add_xor_literal_clause(&c,rhs);
	Ok(())
    }
}

impl Backend for CryptoMiniSat {
    fn solve(&mut self)->Result<Outcome> {
	debug!(vars = self.nvars,"running cryptominisat");
	match self.solver.solve() {
	    Lbool::True => {
		let model = self.solver.get_model().iter().map(|x| *x == Lbool::True).collect();
		Ok(Outcome::Sat(model))
	    },
	    Lbool::False => Ok(Outcome::Unsat),
	    Lbool::Undef => Err(Error::Backend("solver returned an indeterminate result".to_string()))
	}
    }
}

/// Records clauses for an external solver.  XOR constraints are expanded.
#[derive(Debug, Default, Clone)]
pub struct Dimacs {
    nvars:u32,
    clauses:Vec<Vec<Literal>>
}

impl Dimacs {
    pub fn new()->Self {
	Self::default()
    }

    pub fn clauses(&self)->&[Vec<Literal>] {
	&self.clauses
    }

    pub fn write<W:Write>(&self,fd:&mut W)->std::io::Result<()> {
	writeln!(fd,"p cnf {} {}",self.nvars,self.clauses.len())?;
	for c in self.clauses.iter() {
	    for l in c.iter() {
		write!(fd,"{} ",l.to_dimacs())?;
	    }
	    writeln!(fd,"0")?;
	}
	Ok(())
    }

    pub fn save<P:AsRef<Path>>(&self,path:P)->Result<()> {
	let fd = File::create(path)?;
	let mut fd = BufWriter::new(fd);
	self.write(&mut fd)?;
	fd.flush()?;
	Ok(())
    }
}

impl ClauseSink for Dimacs {
    fn new_var(&mut self)->u32 {
	self.nvars += 1;
	self.nvars - 1
    }

    fn num_vars(&self)->u32 {
	self.nvars
    }

    fn add_clause(&mut self,lits:&[Literal])->Result<()> {
	self.clauses.push(lits.to_vec());
	Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holds(c:&[Literal],model:&[bool])->bool {
	c.iter().any(|l| l.value(model))
    }

    #[test]
    fn default_xor_expansion_is_exact() {
	let mut d = Dimacs::new();
	let a = Literal::positive(d.new_var());
	let b = Literal::positive(d.new_var());
	let c = Literal::positive(d.new_var());
	d.add_xor(&[a,!b,c],true).unwrap();
	assert_eq!(d.clauses().len(),4);
	for m in 0..8_u32 {
	    let model = [m & 1 != 0,m & 2 != 0,m & 4 != 0];
	    let parity = model[0] ^ !model[1] ^ model[2];
	    let sat = d.clauses().iter().all(|c| holds(c,&model));
	    assert_eq!(sat,parity);
	}
    }

    #[test]
    fn dimacs_text() {
	let mut d = Dimacs::new();
	let a = Literal::positive(d.new_var());
	let b = Literal::positive(d.new_var());
	d.add_clause(&[a,!b]).unwrap();
	d.add_clause(&[b]).unwrap();
	let mut out = Vec::new();
	d.write(&mut out).unwrap();
	assert_eq!(String::from_utf8(out).unwrap(),"p cnf 2 2\n1 -2 0\n2 0\n");
    }

    #[test]
    fn cryptominisat_solves_and_refutes() {
	let mut s = CryptoMiniSat::new().with_threads(1).with_verbosity(0);
	let a = Literal::positive(s.new_var());
	let b = Literal::positive(s.new_var());
	s.add_xor(&[a,b],true).unwrap();
	s.add_clause(&[a]).unwrap();
	match s.solve().unwrap() {
	    Outcome::Sat(m) => {
		assert!(a.value(&m));
		assert!(!b.value(&m));
	    },
	    Outcome::Unsat => panic!("expected a model")
	}
	s.add_clause(&[b]).unwrap();
	assert_eq!(s.solve().unwrap(),Outcome::Unsat);
    }
}
