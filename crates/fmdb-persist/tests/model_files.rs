//! Whole-model load and save through files on disk

use fmdb_persist::{read_str, FileOptions, LoadError, ModelFile, VersionError};
use fmdb_store::{Database, EntityData, ScopeKey, Severity};
use fmdb_test_utils::{
    collecting_db, connected, current_model_text, init_tracing, model_text, nested_model,
    two_entity_model, write_model,
};
use fmdb_types::{BaseId, FormatVersion, RefTarget, ScopePath, TypeTag, UserId};
use pretty_assertions::assert_eq;

fn owner_of(db: &Database, triad: fmdb_types::Handle) -> Option<fmdb_types::Handle> {
    db.entity(triad)?.data.as_triad()?.owner_link.handle()
}

#[test]
fn two_entity_model_survives_save_and_load() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let (db, _) = two_entity_model();
    let path = dir.path().join("crane.fmm");
    ModelFile::new(&path).save(&db)?;

    let mut loaded = Database::new();
    let report = ModelFile::new(&path).load(&mut loaded)?;
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.save_counter, 1);

    let triad = loaded
        .find(&RefTarget::root(TypeTag::Triad, 1))
        .expect("triad 1");
    let part = owner_of(&loaded, triad).expect("owner resolved");
    let part = loaded.entity(part).expect("live part");
    assert_eq!(part.user_id(), UserId::new(2));
    assert_eq!(part.description, "chassis");
    Ok(())
}

#[test]
fn external_sub_assembly_round_trips() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (mut db, model) = nested_model();
    db.get_mut(model.outer)?
        .data
        .as_sub_assembly_mut()
        .expect("sub-assembly")
        .model_file = "arm.fmm".into();

    let saved = ModelFile::new(dir.path().join("main.fmm")).save(&db)?;
    assert_eq!(saved.files.len(), 2);
    let arm = std::fs::read_to_string(dir.path().join("arm.fmm"))?;
    assert!(arm.contains("!Submodel: [1]\n"));
    assert!(arm.contains("LINK\n{\n  ID = 5;"));

    let mut loaded = Database::new();
    let report = ModelFile::new(dir.path().join("main.fmm")).load(&mut loaded)?;
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.external_files, vec![dir.path().join("arm.fmm")]);
    assert_eq!(loaded.count(TypeTag::Part), 1);

    let outer = loaded.scope_at(&ScopePath::from_ids(&[1])).expect("scope [1]");
    let triad = loaded.ring(outer, TypeTag::Triad).get(UserId::new(3)).expect("triad 3");
    let part = owner_of(&loaded, triad).expect("owner resolved");
    assert_eq!(loaded.id_path(part, true), "[5,2,1]");
    Ok(())
}

#[test]
fn external_files_can_be_inlined() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (mut db, model) = nested_model();
    db.get_mut(model.outer)?
        .data
        .as_sub_assembly_mut()
        .expect("sub-assembly")
        .model_file = "arm.fmm".into();

    let options = FileOptions::default().with_write_external(false);
    let saved = ModelFile::new(dir.path().join("main.fmm")).with_options(options).save(&db)?;
    assert_eq!(saved.files.len(), 1);
    assert!(!dir.path().join("arm.fmm").exists());

    let mut loaded = Database::new();
    let options = FileOptions::default().with_load_external(false);
    ModelFile::new(dir.path().join("main.fmm")).with_options(options).load(&mut loaded)?;
    assert_eq!(loaded.count(TypeTag::Part), 1);
    Ok(())
}

#[test]
fn old_files_are_migrated() -> anyhow::Result<()> {
    let text = model_text(
        FormatVersion::new(4, 0, 0),
        "TRIAD\n{\n  ID = 1;\n  GL_VEL = 1 2 3;\n}\n\n\
         ANALYSIS\n{\n  ID = 1;\n  GRAVITY = 0 0 -9.81;\n  POSITION_TOLERANCE = 0.001;\n}\n",
    );
    let mut db = Database::new();
    let report = read_str(&mut db, &text)?;
    assert_eq!(report.version, FormatVersion::new(4, 0, 0));
    assert!(report.unknown_keywords.is_empty(), "{:?}", report.unknown_summary());

    let triad = db.find(&RefTarget::root(TypeTag::Triad, 1)).expect("triad");
    let velocity = db.entity(triad).and_then(|e| e.data.as_triad()).map(|t| t.init_velocity);
    assert_eq!(velocity, Some([1.0, 2.0, 3.0]));

    let mechanism = db.mechanism().expect("mechanism created");
    let EntityData::Mechanism(mechanism) = &db.entity(mechanism).expect("live").data else {
        panic!("mechanism has the wrong data");
    };
    assert_eq!(mechanism.gravity, [0.0, 0.0, -9.81]);
    assert!((mechanism.position_tolerance - 0.001).abs() < f64::EPSILON);
    Ok(())
}

#[test]
fn current_files_keep_obsolete_keywords_unknown() -> anyhow::Result<()> {
    let text = current_model_text("TRIAD\n{\n  ID = 1;\n  GL_VEL = 1 2 3;\n  GL_VEL = 1 2 3;\n}\n");
    let mut db = Database::new();
    let report = read_str(&mut db, &text)?;
    assert_eq!(
        report.unknown_summary(),
        vec!["GL_VEL is not a defined fmm-file keyword for Triads (2x)".to_string()]
    );
    Ok(())
}

#[test]
fn newer_file_leaves_database_untouched() {
    let (mut db, model) = two_entity_model();
    let text = model_text(FormatVersion::new(99, 0, 0), "TRIAD\n{\n  ID = 7;\n}\n");
    let err = read_str(&mut db, &text).unwrap_err();
    assert!(matches!(
        err,
        LoadError::Version {
            source: VersionError::TooNew { .. },
            ..
        }
    ));
    assert!(db.contains(model.triad));
    assert_eq!(db.count(TypeTag::Triad), 1);
}

#[test]
fn malformed_block_restores_previous_model() {
    let (mut db, model) = two_entity_model();
    let text = current_model_text("TRIAD\n{\n  ID = 3;\n}\n\nLINK\n{\n  ID = 4;\n  MASS = heavy;\n}\n");
    let err = read_str(&mut db, &text).unwrap_err();
    let LoadError::Format { source, .. } = err else {
        panic!("expected a format error, got {err}");
    };
    assert_eq!(source.line(), 10);
    assert!(db.contains(model.part));
    assert_eq!(db.count(TypeTag::Triad), 1);
    assert_eq!(db.count(TypeTag::Part), 1);
}

#[test]
fn missing_end_marker_is_reported() -> anyhow::Result<()> {
    let (mut db, sink) = collecting_db();
    let text = format!("{}\nTRIAD\n{{\n  ID = 1;\n}}\n", fmdb_persist::header_line());
    let report = read_str(&mut db, &text)?;
    assert!(report.missing_end);
    assert!(!report.is_clean());
    assert!(sink.contains("no END marker"));
    assert_eq!(db.count(TypeTag::Triad), 1);
    Ok(())
}

#[test]
fn duplicate_ids_on_file_are_renumbered() -> anyhow::Result<()> {
    let (mut db, sink) = collecting_db();
    let text = current_model_text("TRIAD\n{\n  ID = 1;\n}\n\nTRIAD\n{\n  ID = 1;\n  DESCR = \"twin\";\n}\n");
    let report = read_str(&mut db, &text)?;
    assert_eq!(report.structural.len(), 1);
    assert!(report.structural[0].contains("was given ID 2"));
    assert!(!sink.messages(Severity::Warning).is_empty());

    let twin = db.ring(ScopeKey::Root, TypeTag::Triad).get(UserId::new(2)).expect("renumbered");
    assert_eq!(db.entity(twin).expect("live").description, "twin");
    Ok(())
}

#[test]
fn second_save_keeps_backup() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("m.fmm");
    let (mut db, _) = two_entity_model();
    let mut file = ModelFile::new(&path).with_options(FileOptions::default().with_backup_suffix(".old"));
    file.save(&db)?;
    connected(&mut db, TypeTag::Triad, ScopeKey::Root, 8);
    let report = file.save(&db)?;

    assert_eq!(report.backups, vec![dir.path().join("m.fmm.old")]);
    let previous = std::fs::read_to_string(dir.path().join("m.fmm.old"))?;
    assert!(previous.contains("!Last saved: #1,"));
    assert!(!previous.contains("ID = 8;"));
    assert!(std::fs::read_to_string(&path)?.contains("ID = 8;"));
    Ok(())
}

#[test]
fn failed_save_writes_emergency_copy() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (db, _) = two_entity_model();
    let options = FileOptions::default().with_emergency_dir(dir.path());
    let mut file = ModelFile::new(dir.path().join("missing").join("m.fmm")).with_options(options);

    let err = file.save(&db).unwrap_err();
    let emergency = err.emergency_file().expect("emergency copy").clone();
    assert_eq!(emergency, dir.path().join(fmdb_persist::EMERGENCY_FILE_NAME));
    assert!(std::fs::read_to_string(emergency)?.contains("TRIAD"));
    assert_eq!(file.save_counter(), 0);
    Ok(())
}

#[test]
fn load_from_path_reports_io_errors() {
    let mut db = Database::new();
    let err = ModelFile::new("/no/such/dir/model.fmm").load(&mut db).unwrap_err();
    assert!(matches!(err, LoadError::Io { .. }));
}

#[test]
fn written_model_file_reads_back() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_model(
        dir.path(),
        "hand.fmm",
        &current_model_text("LINK\n{\n  ID = 2;\n  DESCR = \"frame\";\n}\n"),
    )?;
    let mut db = Database::new();
    let report = ModelFile::new(path).load(&mut db)?;
    assert_eq!(report.blocks_read, 1);
    assert_eq!(report.read_counts.get("DESCR"), Some(&1));
    Ok(())
}

#[test]
fn scope_block_after_its_members_keeps_its_base_id() -> anyhow::Result<()> {
    let text = current_model_text(
        "TRIAD\n{\n  ID = 1;\n  BASE_ID = 7;\n  PARENT_ASSEMBLY = FcSUBASSEMBLY 2;\n}\n\n\
         SUBASSEMBLY\n{\n  ID = 2;\n  BASE_ID = 50;\n  DESCR = \"arm\";\n}\n",
    );
    let mut db = Database::new();
    let report = read_str(&mut db, &text)?;
    assert!(report.structural.is_empty(), "{:?}", report.structural);

    let scope = db.scope_at(&ScopePath::from_ids(&[2])).expect("scope [2]");
    let owner = scope.assembly().expect("sub-assembly scope");
    assert_eq!(db.entity(owner).expect("live").base_id(), BaseId::new(50));
    assert_eq!(db.by_base_id(BaseId::new(50)), Some(owner));
    assert_eq!(db.ring(scope, TypeTag::Triad).len(), 1);

    let mut reloaded = Database::new();
    read_str(&mut reloaded, &fmdb_persist::write_string(&db))?;
    let owner = reloaded.by_base_id(BaseId::new(50)).expect("base ID kept");
    assert_eq!(reloaded.entity(owner).expect("live").description, "arm");
    Ok(())
}

#[test]
fn repeated_sub_assembly_block_is_renumbered() -> anyhow::Result<()> {
    let (mut db, _sink) = collecting_db();
    let text = current_model_text(
        "SUBASSEMBLY\n{\n  ID = 2;\n  DESCR = \"left\";\n}\n\n\
         SUBASSEMBLY\n{\n  ID = 2;\n  DESCR = \"right\";\n}\n",
    );
    let report = read_str(&mut db, &text)?;
    assert_eq!(db.count(TypeTag::SubAssembly), 2);
    assert_eq!(report.structural.len(), 1);
    assert!(report.structural[0].contains("was given ID 3"), "{:?}", report.structural);

    let description = |id: i32| {
        db.scope_at(&ScopePath::from_ids(&[id]))
            .and_then(ScopeKey::assembly)
            .and_then(|h| db.entity(h))
            .map(|e| e.description.clone())
    };
    assert_eq!(description(2).as_deref(), Some("left"));
    assert_eq!(description(3).as_deref(), Some("right"));
    Ok(())
}

#[test]
fn mutual_forward_references_resolve_on_load() -> anyhow::Result<()> {
    let text = current_model_text(
        "ENGINE\n{\n  ID = 1;\n  ARGUMENT = FcSIMPLE_SENSOR 2;\n}\n\n\
         SENSOR\n{\n  ID = 2;\n  MEASURED = FcENGINE 1;\n}\n",
    );
    let mut db = Database::new();
    let report = read_str(&mut db, &text)?;
    assert!(report.is_clean(), "{report:?}");

    let engine = db.find(&RefTarget::root(TypeTag::Engine, 1)).expect("engine 1");
    let sensor = db.find(&RefTarget::root(TypeTag::SimpleSensor, 2)).expect("sensor 2");
    let EntityData::Engine(e) = &db.entity(engine).expect("live").data else {
        panic!("engine has the wrong data");
    };
    assert_eq!(e.argument.handle(), Some(sensor));
    let EntityData::SimpleSensor(s) = &db.entity(sensor).expect("live").data else {
        panic!("sensor has the wrong data");
    };
    assert_eq!(s.measured.handle(), Some(engine));
    Ok(())
}

#[test]
fn migrated_file_is_stable_across_save_and_reload() -> anyhow::Result<()> {
    let old = model_text(
        FormatVersion::new(4, 0, 0),
        "TRIAD\n{\n  ID = 1;\n  GL_VEL = 1 2 3;\n  OWNER_LINK = FcLINK 2;\n}\n\n\
         LINK\n{\n  ID = 2;\n  MASS = 1.5;\n  OVERRIDE_LINK_CHECKSUM = true;\n}\n\n\
         ANALYSIS\n{\n  ID = 1;\n  GRAVITY = 0 0 -9.81;\n  POSITION_TOLERANCE = 0.001;\n}\n",
    );
    let mut first = Database::new();
    let report = read_str(&mut first, &old)?;
    assert!(report.is_clean(), "{report:?}");
    let saved = fmdb_persist::write_string(&first);

    let mut second = Database::new();
    let report = read_str(&mut second, &saved)?;
    assert!(report.is_clean(), "{report:?}");
    assert!(report.migration.is_empty());

    let triad = |db: &Database| {
        let h = db.find(&RefTarget::root(TypeTag::Triad, 1)).expect("triad 1");
        let t = db.entity(h).and_then(|e| e.data.as_triad()).expect("triad data");
        (t.init_velocity, t.owner_link.target().cloned())
    };
    assert_eq!(triad(&first), triad(&second));

    let part = |db: &Database| {
        let h = db.find(&RefTarget::root(TypeTag::Part, 2)).expect("part 2");
        let p = db.entity(h).and_then(|e| e.data.as_part()).expect("part data");
        (p.mass, p.override_checksum)
    };
    assert_eq!(part(&first), (1.5, true));
    assert_eq!(part(&first), part(&second));

    let mechanism = |db: &Database| match &db.entity(db.mechanism().expect("mechanism"))?.data {
        EntityData::Mechanism(m) => Some(m.clone()),
        _ => None,
    };
    assert_eq!(mechanism(&first), mechanism(&second));

    let stable = |text: &str| -> Vec<String> {
        text.lines()
            .filter(|line| !line.starts_with("!Last saved"))
            .map(str::to_string)
            .collect()
    };
    assert_eq!(stable(&fmdb_persist::write_string(&second)), stable(&saved));
    Ok(())
}
