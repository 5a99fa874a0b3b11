pub type Index = u32;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Op {
    And = 0,
    Xor = 1
}

// Builds bit-formulas.  Every method returns a handle to a (possibly shared)
// gate; nothing is ever mutated in place.
pub trait GateSoup {
    fn zero(&self)->Index;
    fn one(&self)->Index;
    fn new_input(&mut self)->Index;
    fn not(&mut self,a:Index)->Index;
    fn binop(&mut self,op:Op,a:Index,b:Index)->Index;
    fn maj(&mut self,a:Index,b:Index,c:Index)->Index;
    fn full_adder(&mut self,a:Index,b:Index,c:Index)->(Index,Index);

    fn constant(&self,b:bool)->Index {
	if b { self.one() } else { self.zero() }
    }

    fn and(&mut self,a:Index,b:Index)->Index {
	self.binop(Op::And,a,b)
    }

    fn xor(&mut self,a:Index,b:Index)->Index {
	self.binop(Op::Xor,a,b)
    }

    fn or(&mut self,a:Index,b:Index)->Index {
	let na = self.not(a);
	let nb = self.not(b);
	let c = self.and(na,nb);
	self.not(c)
    }
}
