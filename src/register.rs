use std::io::Write;

use crate::gate_soup::{GateSoup,Index};
use crate::machine::{Lowering,Valuation};

/// A fixed-width word of bit-formulas, least significant bit first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register(Vec<Index>);

impl Register {
    /// Writes `name bit literal` lines, the literal in DIMACS numbering.
    pub fn dump<P:AsRef<std::path::Path>>(path:P,regs:&[(String,&Register)],
					  lowering:&Lowering)->Result<(),std::io::Error> {
	let fd = std::fs::File::create(path)?;
	let mut fd = std::io::BufWriter::new(fd);

	for (name,Register(u)) in regs.iter() {
	    for (i,&j) in u.iter().enumerate() {
		writeln!(fd,"{} {} {}",name,i,lowering.literal(j).to_dimacs())?
	    }
	}
	fd.flush()
    }

    pub fn input<M:GateSoup>(mac:&mut M,n:usize)->Self {
	Register( (0..n).map(|_k| mac.new_input()).collect() )
    }

    pub fn constant<M:GateSoup>(mac:&M,bits:usize,x:u64)->Self {
	Register( (0..bits).map(|i| mac.constant(i < 64 && (x >> i) & 1 != 0)).collect() )
    }

    pub fn len(&self)->usize {
	self.0.len()
    }

    pub fn is_empty(&self)->bool {
	self.0.is_empty()
    }

    pub fn bits(&self)->&[Index] {
	&self.0
    }

    pub fn set_bit(&mut self,i:usize,bit:Index) {
	self.0[i] = bit;
    }

    pub fn rotate_left(&self,s:usize)->Self {
	let Register(v) = &self;
	let n = v.len();
	Register( (0..n).map(|k| v[(k + n - s % n) % n]).collect())
    }

    pub fn rotate_halves(&self)->Self {
	self.rotate_left(self.len() / 2)
    }

    pub fn shift_left(&self,s:usize,zero:Index)->Self {
	let Register(v) = &self;
	let n = v.len();
	Register( (0..n).map(|k| if k >= s { v[k - s] } else { zero }).collect())
    }

    /// `2*x+1`, truncated.
    pub fn odd<M:GateSoup>(&self,mac:&M)->Self {
	let mut r = self.shift_left(1,mac.zero());
	if !r.is_empty() {
	    r.set_bit(0,mac.one());
	}
	r
    }

    pub fn slice(&self,j0:usize,n:usize)->Self {
	Register(Vec::from(&self.0[j0..j0+n]))
    }

    pub fn join(&self,other:&Self)->Self {
	let mut u = self.0.clone();
	u.extend_from_slice(&other.0);
	Register(u)
    }

    fn check_width(&self,what:&str,other:&Self) {
	if self.len() != other.len() {
	    panic!("Mismatched register sizes for {}, {} vs {}",what,self.len(),other.len());
	}
    }

    pub fn scale<M:GateSoup>(&self,mac:&mut M,bit:Index)->Self {
	Register(self.0.iter().map(|&u| mac.and(bit,u)).collect())
    }

    pub fn and<M:GateSoup>(&self,mac:&mut M,other:&Self)->Self {
	self.check_width("and",other);
	Register(self.0.iter().zip(other.0.iter()).map(|(&u,&v)| mac.and(u,v)).collect())
    }

    pub fn xor<M:GateSoup>(&self,mac:&mut M,other:&Self)->Self {
	self.check_width("xor",other);
	Register(self.0.iter().zip(other.0.iter()).map(|(&u,&v)| mac.xor(u,v)).collect())
    }

    /// Ripple-carry addition; returns the sum and the carry out of the top bit.
    pub fn add<M:GateSoup>(&self,mac:&mut M,other:&Self,carry:Index)->(Self,Index) {
	self.check_width("add",other);
	let mut c = carry;
	let w = self.0.iter().zip(other.0.iter()).map(|(&u,&v)| {
	    let (s,c2) = mac.full_adder(u,v,c);
	    c = c2;
	    s
	}).collect();
	(Register(w),c)
    }

    /// Shift-and-add product modulo 2^n.
    pub fn mul<M:GateSoup>(&self,mac:&mut M,other:&Self)->Self {
	self.check_width("mul",other);
	let n = self.len();
	if n == 0 {
	    return Register(vec![]);
	}
	let zero = mac.zero();
	let mut acc = other.scale(mac,self.0[0]);
	for i in 1..n {
	    let addend = other.slice(0,n - i).scale(mac,self.0[i]);
	    let (hi,_) = acc.slice(i,n - i).add(mac,&addend,zero);
	    acc = acc.slice(0,i).join(&hi);
	}
	acc
    }

    pub fn constraints(&self,x:u64)->Vec<(Index,bool)> {
	self.0.iter().enumerate().map(|(i,&u)| (u,i < 64 && (x >> i) & 1 != 0)).collect()
    }

    pub fn value(&self,values:&Valuation)->u64 {
	let n = self.0.len();
	if n > 64 {
	    panic!("Register of {} bits does not fit a machine word",n);
	}
	let mut q = 0;
	for i in (0..n).rev() {
	    q <<= 1;
	    if values.get(self.0[i]) {
		q |= 1;
	    }
	}
	q
    }
}
