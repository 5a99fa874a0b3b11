use std::fs;

use prvsat::attack::{Attack,Schedule};
use prvsat::config::FusedParams;

#[test]
fn dimacs_and_register_map() {
    let p = FusedParams{ num_obs:4,..FusedParams::default() };
    let inst = Attack::new(Schedule::Fused(p)).unwrap().build();
    let dir = tempfile::tempdir().unwrap();
    let cnf = dir.path().join("fused.cnf");
    let map = dir.path().join("fused.map");
    let lowering = inst.export(&cnf,Some(map.as_path())).unwrap();

    let text = fs::read_to_string(&cnf).unwrap();
    let mut lines = text.lines();
    let header:Vec<&str> = lines.next().unwrap().split_whitespace().collect();
    assert_eq!(header[..2],["p","cnf"]);
    let nvars:usize = header[2].parse().unwrap();
    let nclauses:usize = header[3].parse().unwrap();
    assert_eq!(nvars,lowering.vars);
    assert_eq!(lines.clone().count(),nclauses);
    assert!(nclauses >= lowering.clauses);
    for l in lines {
	assert!(l.ends_with(" 0") || l == "0");
	for x in l.split_whitespace() {
	    let x:i64 = x.parse().unwrap();
	    assert!(x.unsigned_abs() as usize <= nvars);
	}
    }

    // seed, lcg and two hash words, six bits each
    let map = fs::read_to_string(&map).unwrap();
    let entries:Vec<Vec<&str>> = map.lines().map(|l| l.split_whitespace().collect()).collect();
    assert_eq!(entries.len(),24);
    assert_eq!(entries[0][..2],["seed","0"]);
    assert_eq!(entries[23][..2],["hash[1]","5"]);
    for e in entries.iter() {
	let lit:i64 = e[2].parse().unwrap();
	assert!(lit > 0 && lit as usize <= nvars);
    }
}

#[test]
fn export_without_map() {
    let p = FusedParams{ num_obs:2,..FusedParams::default() };
    let inst = Attack::new(Schedule::Fused(p)).unwrap().build();
    let dir = tempfile::tempdir().unwrap();
    let cnf = dir.path().join("a.cnf");
    inst.export(&cnf,None).unwrap();
    assert!(fs::read_to_string(&cnf).unwrap().starts_with("p cnf "));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(),1);
}
