use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::gate_soup::{GateSoup,Index,Op};
use crate::solver::{ClauseSink,Literal};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Gate {
    Const(bool),
    Input(Index),
    Not(Index),
    Binop(Op,Index,Index),
    Maj(Index,Index,Index)
}

/// One truth value per gate of a `Machine`, indexed by gate handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valuation(Vec<bool>);

impl Valuation {
    pub fn get(&self,i:Index)->bool {
	self.0[i as usize]
    }

    pub fn len(&self)->usize {
	self.0.len()
    }

    pub fn is_empty(&self)->bool {
	self.0.is_empty()
    }
}

/// Backend literal of every gate after lowering.
#[derive(Debug, Clone)]
pub struct Lowering {
    lits:Vec<Literal>,
    pub vars:usize,
    pub clauses:usize
}

impl Lowering {
    pub fn literal(&self,i:Index)->Literal {
	self.lits[i as usize]
    }

    pub fn covered_by(&self,model:&[bool])->bool {
	self.lits.iter().all(|l| (l.var() as usize) < model.len())
    }

    pub fn valuation(&self,model:&[bool])->Valuation {
	Valuation(self.lits.iter().map(|l| l.value(model)).collect())
    }
}

/// Hash-consed gate network plus the equality assertions bound to it.
///
/// Gates only ever reference gates with a smaller handle, so the table is
/// always in topological order.  Handles 0 and 1 are the constants.
pub struct Machine {
    spec:Vec<Gate>,
    index:BTreeMap<Gate,Index>,
    inputs:Vec<Index>,
    adders:BTreeMap<(Index,Index,Index),(Index,Index)>,
    assertions:Vec<(Index,bool)>
}

impl Default for Machine {
    fn default()->Self {
	Self::new()
    }
}

impl Machine {
    pub fn new()->Self {
	let mut mac = Machine{
	    spec:Vec::new(),
	    index:BTreeMap::new(),
	    inputs:Vec::new(),
	    adders:BTreeMap::new(),
	    assertions:Vec::new()
	};
	mac.get(&Gate::Const(false));
	mac.get(&Gate::Const(true));
	mac
    }

    pub fn find(&self,b:&Gate)->Option<Index> {
	self.index.get(b).copied()
    }

    pub fn get(&mut self,b:&Gate)->Index {
	match self.find(b) {
	    Some(i) => i,
	    None => {
		let i = self.spec.len() as Index;
		self.spec.push(*b);
		self.index.insert(*b,i);
		i
	    }
	}
    }

    pub fn gate(&self,i:Index)->Gate {
	self.spec[i as usize]
    }

    pub fn len(&self)->usize {
	self.spec.len()
    }

    pub fn is_empty(&self)->bool {
	self.spec.is_empty()
    }

    pub fn num_inputs(&self)->usize {
	self.inputs.len()
    }

    pub fn num_adders(&self)->usize {
	self.adders.len()
    }

    pub fn assertions(&self)->&[(Index,bool)] {
	&self.assertions
    }

    pub fn as_const(&self,i:Index)->Option<bool> {
	match self.gate(i) {
	    Gate::Const(b) => Some(b),
	    _ => None
	}
    }

    fn is_negation(&self,a:Index,b:Index)->bool {
	self.gate(a) == Gate::Not(b) || self.gate(b) == Gate::Not(a)
    }

    pub fn assert_bits(&mut self,cst:&[(Index,bool)]) {
	self.assertions.extend_from_slice(cst);
    }

    /// Forward evaluation with the given input gates pinned; the other
    /// inputs read as false.
    pub fn eval(&self,inputs:&[(Index,bool)])->Valuation {
	let n = self.spec.len();
	let mut pinned = vec![false;n];
	for &(i,b) in inputs.iter() {
	    match self.gate(i) {
		Gate::Input(_) => pinned[i as usize] = b,
		g => panic!("Gate {} is not an input: {:?}",i,g)
	    }
	}
	let mut value:Vec<bool> = Vec::with_capacity(n);
	for (i,g) in self.spec.iter().enumerate() {
	    let v = |j:Index| value[j as usize];
	    let x = match *g {
		Gate::Const(b) => b,
		Gate::Input(_) => pinned[i],
		Gate::Not(a) => !v(a),
		Gate::Binop(Op::And,a,b) => v(a) & v(b),
		Gate::Binop(Op::Xor,a,b) => v(a) ^ v(b),
		Gate::Maj(a,b,c) => (v(a) & v(b)) | (v(a) & v(c)) | (v(b) & v(c))
	    };
	    value.push(x);
	}
	Valuation(value)
    }

    pub fn satisfied(&self,val:&Valuation)->bool {
	self.assertions.iter().all(|&(i,b)| val.get(i) == b)
    }

    /// Tseitin-encodes every gate and assertion into `sink`.
    pub fn lower<S:ClauseSink>(&self,sink:&mut S)->Result<Lowering> {
	let mut vars = 0;
	let mut clauses = 0;
	let mut fresh = |sink:&mut S| {
	    vars += 1;
	    Literal::positive(sink.new_var())
	};

	let top = fresh(sink);
	sink.add_clause(&[top])?;
	clauses += 1;

	let mut lits:Vec<Literal> = Vec::with_capacity(self.spec.len());
	for g in self.spec.iter() {
	    let l = |j:Index| lits[j as usize];
	    let o = match *g {
		Gate::Const(b) => if b { top } else { !top },
		Gate::Input(_) => fresh(sink),
		Gate::Not(a) => !l(a),
		Gate::Binop(Op::Xor,a,b) => {
		    let o = fresh(sink);
		    sink.add_xor(&[o,l(a),l(b)],false)?;
		    clauses += 1;
		    o
		},
		Gate::Binop(Op::And,a,b) => {
		    let (a,b) = (l(a),l(b));
		    let o = fresh(sink);
		    sink.add_clause(&[!o,a])?;
		    sink.add_clause(&[!o,b])?;
		    sink.add_clause(&[o,!a,!b])?;
		    clauses += 3;
		    o
		},
		Gate::Maj(a,b,c) => {
		    let (a,b,c) = (l(a),l(b),l(c));
		    let o = fresh(sink);
		    sink.add_clause(&[!a,!b,o])?;
		    sink.add_clause(&[!a,!c,o])?;
		    sink.add_clause(&[!b,!c,o])?;
		    sink.add_clause(&[a,b,!o])?;
		    sink.add_clause(&[a,c,!o])?;
		    sink.add_clause(&[b,c,!o])?;
		    clauses += 6;
		    o
		}
	    };
	    lits.push(o);
	}

	for &(i,b) in self.assertions.iter() {
	    let u = lits[i as usize];
	    sink.add_clause(&[if b { u } else { !u }])?;
	    clauses += 1;
	}

	debug!(gates = self.spec.len(),vars,clauses,"lowered constraint network");
	Ok(Lowering{ lits,vars,clauses })
    }
}

impl GateSoup for Machine {
    fn zero(&self)->Index {
	0
    }

    fn one(&self)->Index {
	1
    }

    fn new_input(&mut self)->Index {
	let k = self.inputs.len() as Index;
	let i = self.get(&Gate::Input(k));
	self.inputs.push(i);
	i
    }

    fn not(&mut self,a:Index)->Index {
	match self.gate(a) {
	    Gate::Const(b) => self.constant(!b),
	    Gate::Not(x) => x,
	    _ => self.get(&Gate::Not(a))
	}
    }

    // Constants sort first, so only `a` needs checking.
    fn binop(&mut self,op:Op,a:Index,b:Index)->Index {
	let (a,b) = if a <= b { (a,b) } else { (b,a) };
	match op {
	    Op::And => {
		if a == b {
		    return a;
		}
		match self.as_const(a) {
		    Some(false) => return self.zero(),
		    Some(true) => return b,
		    None => ()
		}
		if self.is_negation(a,b) {
		    return self.zero();
		}
		self.get(&Gate::Binop(Op::And,a,b))
	    },
	    Op::Xor => {
		if a == b {
		    return self.zero();
		}
		match self.as_const(a) {
		    Some(false) => return b,
		    Some(true) => return self.not(b),
		    None => ()
		}
		if self.is_negation(a,b) {
		    return self.one();
		}
		if let Gate::Not(x) = self.gate(a) {
		    let y = self.xor(x,b);
		    return self.not(y);
		}
		if let Gate::Not(x) = self.gate(b) {
		    let y = self.xor(a,x);
		    return self.not(y);
		}
		self.get(&Gate::Binop(Op::Xor,a,b))
	    }
	}
    }

    fn maj(&mut self,a:Index,b:Index,c:Index)->Index {
	let mut t = [a,b,c];
	t.sort_unstable();
	let [a,b,c] = t;
	if a == b || a == c {
	    return a;
	}
	if b == c {
	    return b;
	}
	match self.as_const(a) {
	    Some(false) => return self.and(b,c),
	    Some(true) => return self.or(b,c),
	    None => ()
	}
	if self.is_negation(a,b) {
	    return c;
	}
	if self.is_negation(a,c) {
	    return b;
	}
	if self.is_negation(b,c) {
	    return a;
	}
	self.get(&Gate::Maj(a,b,c))
    }

    fn full_adder(&mut self,a:Index,b:Index,c:Index)->(Index,Index) {
	let mut t = [a,b,c];
	t.sort_unstable();
	let key = (t[0],t[1],t[2]);
	if let Some(&r) = self.adders.get(&key) {
	    return r;
	}
	let ab = self.xor(t[0],t[1]);
	let sum = self.xor(ab,t[2]);
	let carry = self.maj(t[0],t[1],t[2]);
	self.adders.insert(key,(sum,carry));
	(sum,carry)
    }
}
