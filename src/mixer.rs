use crate::gate_soup::GateSoup;
use crate::machine::Machine;
use crate::register::Register;

pub const FIREWALL_LANES : usize = 4;
pub const FIREWALL_HASH : usize = 5;

pub fn mask(width:usize)->u64 {
    if width >= 64 { !0 } else { (1_u64 << width) - 1 }
}

/// `(0b1010..10, 0b0101..01)` over `width` bits: the constants added to the
/// hash word and to lcg respectively.
pub fn round_constants(width:usize)->(u64,u64) {
    let mut a = 0_u64;
    let mut b = 0_u64;
    for _ in 0..width / 2 {
	a = (a << 2) | 2;
	b = (b << 2) | 1;
    }
    (a,b)
}

/// The operations the mixing core is written against.
pub trait Engine {
    type Word : Clone;

    fn width(&self)->usize;
    fn constant(&mut self,x:u64)->Self::Word;
    fn xor(&mut self,a:&Self::Word,b:&Self::Word)->Self::Word;
    fn add(&mut self,a:&Self::Word,b:&Self::Word)->Self::Word;
    fn mul(&mut self,a:&Self::Word,b:&Self::Word)->Self::Word;
    fn odd(&mut self,a:&Self::Word)->Self::Word;
    fn rotate_halves(&mut self,a:&Self::Word)->Self::Word;
}

fn check_width(width:usize) {
    if width < 2 || width > 64 || width % 2 != 0 {
	panic!("State width must be even and within 2..=64, got {}",width);
    }
}

pub struct ConcreteEngine {
    width:usize,
    mask:u64
}

impl ConcreteEngine {
    pub fn new(width:usize)->Self {
	check_width(width);
	ConcreteEngine{ width,mask:mask(width) }
    }
}

impl Engine for ConcreteEngine {
    type Word = u64;

    fn width(&self)->usize {
	self.width
    }

    fn constant(&mut self,x:u64)->u64 {
	x & self.mask
    }

    fn xor(&mut self,a:&u64,b:&u64)->u64 {
	a ^ b
    }

    fn add(&mut self,a:&u64,b:&u64)->u64 {
	a.wrapping_add(*b) & self.mask
    }

    fn mul(&mut self,a:&u64,b:&u64)->u64 {
	a.wrapping_mul(*b) & self.mask
    }

    fn odd(&mut self,a:&u64)->u64 {
	((a << 1) | 1) & self.mask
    }

    fn rotate_halves(&mut self,a:&u64)->u64 {
	let h = self.width / 2;
	((a >> h) | (a << h)) & self.mask
    }
}

pub struct SymbolicEngine {
    mac:Machine,
    width:usize
}

impl SymbolicEngine {
    pub fn new(width:usize)->Self {
	check_width(width);
	SymbolicEngine{ mac:Machine::new(),width }
    }

    pub fn fresh(&mut self)->Register {
	Register::input(&mut self.mac,self.width)
    }

    pub fn machine(&self)->&Machine {
	&self.mac
    }

    pub fn into_machine(self)->Machine {
	self.mac
    }
}

impl Engine for SymbolicEngine {
    type Word = Register;

    fn width(&self)->usize {
	self.width
    }

    fn constant(&mut self,x:u64)->Register {
	Register::constant(&self.mac,self.width,x)
    }

    fn xor(&mut self,a:&Register,b:&Register)->Register {
	a.xor(&mut self.mac,b)
    }

    fn add(&mut self,a:&Register,b:&Register)->Register {
	let zero = self.mac.zero();
	let (s,_) = a.add(&mut self.mac,b,zero);
	s
    }

    fn mul(&mut self,a:&Register,b:&Register)->Register {
	a.mul(&mut self.mac,b)
    }

    fn odd(&mut self,a:&Register)->Register {
	a.odd(&self.mac)
    }

    fn rotate_halves(&mut self,a:&Register)->Register {
	a.rotate_halves()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step<W> {
    pub seed:W,
    pub lcg:W,
    pub hash:W,
    pub out:W
}

pub fn step<E:Engine>(e:&mut E,seed:&E::Word,lcg:&E::Word,hash:&E::Word)->Step<E::Word> {
    let (ka,kb) = round_constants(e.width());
    let ka = e.constant(ka);
    let kb = e.constant(kb);

    let m = e.odd(lcg);
    let seed = e.mul(seed,&m);
    let rs = e.rotate_halves(&seed);
    let t = e.add(&rs,&ka);
    let hash = e.add(hash,&t);
    let t = e.add(&seed,&kb);
    let lcg = e.add(lcg,&t);
    let seed = e.xor(&seed,&hash);
    let out = e.xor(&lcg,&rs);
    Step{ seed,lcg,hash,out }
}

/// Mixing state with a hash array walked round-robin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Core<W> {
    pub seed:W,
    pub lcg:W,
    pub hash:Vec<W>,
    pub pos:usize
}

impl<W:Clone> Core<W> {
    pub fn new(seed:W,lcg:W,hash:Vec<W>)->Self {
	if hash.is_empty() {
	    panic!("Hash array must not be empty");
	}
	Core{ seed,lcg,hash,pos:0 }
    }

    /// One step on the current hash element, without advancing.
    pub fn mix<E:Engine<Word=W>>(&mut self,e:&mut E)->W {
	let i = self.pos % self.hash.len();
	let s = step(e,&self.seed,&self.lcg,&self.hash[i]);
	self.seed = s.seed;
	self.lcg = s.lcg;
	self.hash[i] = s.hash;
	s.out
    }

    pub fn next<E:Engine<Word=W>>(&mut self,e:&mut E)->W {
	let out = self.mix(e);
	self.pos += 1;
	out
    }

    pub fn inject<E:Engine<Word=W>>(&mut self,e:&mut E,w:&W) {
	self.seed = e.xor(&self.seed,w);
	self.lcg = e.xor(&self.lcg,w);
    }
}

/// Four output lanes sharing a five-word hash array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firewall<W> {
    pub seed:Vec<W>,
    pub lcg:Vec<W>,
    pub hash:Vec<W>,
    pub pos:usize
}

impl<W:Clone> Firewall<W> {
    pub fn new<E:Engine<Word=W>>(e:&mut E)->Self {
	let zero = e.constant(0);
	Firewall{
	    seed:vec![zero.clone();FIREWALL_LANES],
	    lcg:vec![zero.clone();FIREWALL_LANES],
	    hash:vec![zero;FIREWALL_HASH],
	    pos:0
	}
    }

    /// Keyed output enters through the last lane's seed.
    pub fn feed<E:Engine<Word=W>>(&mut self,e:&mut E,out:&W) {
	let k = FIREWALL_LANES - 1;
	self.seed[k] = e.xor(&self.seed[k],out);
    }

    pub fn round<E:Engine<Word=W>>(&mut self,e:&mut E)->Vec<W> {
	let mut outs = Vec::with_capacity(FIREWALL_LANES);
	for k in 0..FIREWALL_LANES {
	    let i = (self.pos + k) % FIREWALL_HASH;
	    let s = step(e,&self.seed[k],&self.lcg[k],&self.hash[i]);
	    self.seed[k] = s.seed;
	    self.lcg[k] = s.lcg;
	    self.hash[i] = s.hash;
	    outs.push(s.out);
	}
	self.pos += 1;
	outs
    }
}
