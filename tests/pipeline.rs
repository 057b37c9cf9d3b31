use std::{
    fs::{self, File},
    io::Write,
    path::PathBuf,
};

use edep_truth::{
    analysis::Analysis,
    comparison::{make_generator_comp, Config, Sample, SampleSpec},
    json::{count_records, events, expand_paths, read_events},
    style::{Colour, Style},
};
use serde_json::{json, Value};

fn workdir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("edep-truth-{name}-{}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_lines(path: &PathBuf, lines: &[Value]) {
    let mut file = File::create(path).unwrap();
    for line in lines {
        writeln!(file, "{line}").unwrap();
    }
}

// muon plus a charged pion; the pion deposit ends at `pion_stop_x`
fn cc_event(id: i32, pion_stop_x: f64, with_neutrino: bool) -> Value {
    let genie = if with_neutrino {
        json!([
            {"status": 0, "pdg": 14, "p4": [0.0, 0.0, 1.2, 1.2]},
            {"status": 1, "pdg": 13, "p4": [0.0, 0.0, 0.994, 1.0]}
        ])
    } else {
        json!([{"status": 1, "pdg": 13, "p4": [0.0, 0.0, 0.994, 1.0]}])
    };
    json!({
        "id": id,
        "primaries": [{
            "position": [0.0, 430.0, 0.0, 0.0],
            "particles": [
                {"track_id": 0, "pdg": 13, "p": [1000.0, 0.0, 0.0, 994.0]},
                {"track_id": 1, "pdg": 211, "p": [500.0, 0.0, 0.0, 480.0]}
            ]
        }],
        "trajectories": [
            {"track_id": 0, "parent_id": -1, "pdg": 13, "p": [1000.0, 0.0, 0.0, 994.0]},
            {"track_id": 1, "parent_id": -1, "pdg": 211, "p": [500.0, 0.0, 0.0, 480.0]}
        ],
        "segment_detectors": [{
            "name": "volTPCActive",
            "segments": [
                {"contributors": [0], "primary_id": 0, "stop": [0.0, 430.0, 2000.0, 1.0], "energy_deposit": 300.0},
                {"contributors": [1], "primary_id": 1, "stop": [pion_stop_x, 430.0, 0.0, 1.0], "energy_deposit": 220.0}
            ]
        }],
        "genie": genie
    })
}

fn nc_event(id: i32) -> Value {
    json!({
        "id": id,
        "primaries": [{
            "position": [0.0, 430.0, 0.0, 0.0],
            "particles": [{"track_id": 0, "pdg": 14, "p": [800.0, 0.0, 0.0, 800.0]}]
        }],
        "genie": [{"status": 0, "pdg": 14, "p4": [0.0, 0.0, 1.0, 1.0]}]
    })
}

#[test]
fn containment_study() {
    let dir = workdir("containment");
    let infile = dir.join("events.jsonl");
    write_lines(
        &infile,
        &[
            cc_event(0, 100., true),
            cc_event(1, 1000., true),
            nc_event(2),
            cc_event(3, 100., false),
        ],
    );

    let records = read_events(&infile).unwrap();
    assert_eq!(records.len(), 4);
    let summary = Analysis::default().run(&records);
    assert_eq!(summary.nevents, 4);
    assert_eq!(summary.not_signal, 1);
    assert_eq!(summary.missing_neutrino, 1);
    assert_eq!(summary.classified, 2);
    assert_eq!(summary.contained, 1);
    assert_eq!(summary.q2_all.value(0), 2.);
    assert_eq!(summary.q2_cont.value(0), 1.);
    // true kinetic energy 0.36 GeV, deposited 0.22 GeV
    assert_eq!(summary.pi_energy_smearing.value(7, 4), 1.);
    assert_eq!(summary.pi_energy_smearing.integral(), 1.);

    let outdir = dir.join("out");
    fs::create_dir_all(&outdir).unwrap();
    summary.write(&outdir, &Style::containment()).unwrap();
    for name in [
        "q2_all.dat",
        "q2_cont.dat",
        "q2_cont_fraction.dat",
        "pi_energy_smearing.dat",
    ] {
        assert!(outdir.join(name).is_file(), "missing {name}");
    }
    let fraction = fs::read_to_string(outdir.join("q2_cont_fraction.dat")).unwrap();
    let first_row = fraction.lines().find(|l| !l.starts_with('#')).unwrap();
    assert!(first_row.starts_with("0e0 2e-1 5e-1 "), "{first_row}");

    fs::remove_dir_all(dir).unwrap();
}

fn write_split_sample(dir: &PathBuf) {
    write_lines(
        &dir.join("run_0.jsonl"),
        &[cc_event(0, 100., true), cc_event(1, 1000., true)],
    );
    write_lines(
        &dir.join("run_1.jsonl"),
        &[nc_event(2), cc_event(3, 100., false), cc_event(4, -200., true)],
    );
}

#[test]
fn streamed_files_match_whole_sample() {
    let dir = workdir("streamed");
    write_split_sample(&dir);

    let infiles = expand_paths(&[dir.join("run_*.jsonl")]).unwrap();
    assert_eq!(infiles, [dir.join("run_0.jsonl"), dir.join("run_1.jsonl")]);
    let nevents: usize = infiles.iter().map(|f| count_records(f).unwrap()).sum();
    assert_eq!(nevents, 5);

    let analysis = Analysis::default();
    let streamed = analysis.run_stream(events(&infiles), nevents).unwrap();
    let mut records = Vec::new();
    for file in &infiles {
        records.extend(read_events(file).unwrap());
    }
    assert_eq!(streamed, analysis.run(&records));
    assert_eq!(streamed.nevents, 5);
    assert_eq!(streamed.classified, 3);
    assert_eq!(streamed.contained, 2);

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn containment_binary_expands_quoted_pattern() {
    let dir = workdir("binary");
    write_split_sample(&dir);
    let outdir = dir.join("out");

    let status = std::process::Command::new(env!("CARGO_BIN_EXE_edep-containment"))
        .arg("--outdir")
        .arg(&outdir)
        .arg("--loglevel")
        .arg("error")
        .arg(dir.join("run_*.jsonl"))
        .status()
        .unwrap();
    assert!(status.success());

    let q2_all = fs::read_to_string(outdir.join("q2_all.dat")).unwrap();
    let first_row = q2_all.lines().find(|l| !l.starts_with('#')).unwrap();
    assert!(first_row.starts_with("0e0 2e-1 3e0 "), "{first_row}");

    let status = std::process::Command::new(env!("CARGO_BIN_EXE_edep-containment"))
        .arg("--loglevel")
        .arg("off")
        .arg(dir.join("nothing_*.jsonl"))
        .status()
        .unwrap();
    assert!(!status.success());

    fs::remove_dir_all(dir).unwrap();
}

#[test]
fn generator_comparison() {
    let dir = workdir("comparison");
    let genie = dir.join("genie.jsonl");
    let nuwro = dir.join("nuwro.jsonl");
    write_lines(
        &genie,
        &[
            json!({"cc": 1, "q0": 0.3, "pdg": [13, 2212, 211], "fScaleFactor": 0.5}),
            json!({"cc": 1, "q0": 0.7, "pdg": [13, 2212, 2212], "fScaleFactor": 0.5}),
            json!({"cc": 0, "q0": 0.2, "pdg": [14, 2212], "fScaleFactor": 0.5}),
        ],
    );
    write_lines(
        &nuwro,
        &[json!({"cc": 1, "q0": 1.5, "pdg": [13, 2112], "scale_factor": 2.0})],
    );

    let mut config = Config::default();
    config.samples = vec![
        SampleSpec {
            name: "GENIE".to_owned(),
            path: genie,
            colour: Colour::BLUE,
        },
        SampleSpec {
            name: "NuWro".to_owned(),
            path: nuwro,
            colour: Colour::MAGENTA,
        },
    ];
    let samples: Vec<_> = config
        .samples
        .iter()
        .map(|spec| Sample::load(spec).unwrap())
        .collect();
    assert_eq!(samples[0].events.len(), 3);

    let nprotons = config
        .plots
        .iter()
        .find(|plot| plot.output == "generator_comp_nprotons.dat")
        .unwrap();
    let comp = make_generator_comp(nprotons, &samples).unwrap();
    let (_, _, genie_hist) = &comp.entries[0];
    assert_eq!(genie_hist.value(1), 0.5);
    assert_eq!(genie_hist.value(2), 0.5);
    let (_, _, nuwro_hist) = &comp.entries[1];
    assert_eq!(nuwro_hist.value(0), 2.);
    assert_eq!(comp.maximum, 1.3 * 2.);

    let out = dir.join(&nprotons.output);
    comp.write_to(&Style::comparison(), &out).unwrap();
    let table = fs::read_to_string(&out).unwrap();
    assert_eq!(table.lines().filter(|l| !l.starts_with('#')).count(), 10);

    fs::remove_dir_all(dir).unwrap();
}
