mod common;

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder};
use common::{context, small_config, synthetic_split, write_dataset, TestBackend};
use dogbreed_core::{Architecture, Error, InputShape, LOSS};
use dogbreed_dataset::prepare;
use dogbreed_training::checkpoint::{CheckpointInfo, CheckpointSink};
use dogbreed_training::summary::{read_events, ScalarEvent};
use dogbreed_training::{
    evaluate, fit, load_model, pipeline, save_model, select_model, DogBreedClassifier,
};

fn weight_bytes(model: &DogBreedClassifier<TestBackend>) -> Vec<u8> {
    record_bytes(model)
}

fn record_bytes<M: Module<TestBackend>>(module: &M) -> Vec<u8> {
    Recorder::<TestBackend>::record(
        &NamedMpkBytesRecorder::<FullPrecisionSettings>::default(),
        module.clone().into_record(),
        (),
    )
    .unwrap()
}

#[test]
fn test_one_epoch_writes_checkpoint_and_logs() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(small_config(dir.path()), "20210803-120000");
    let device = Default::default();
    let shape = InputShape::new(32, 32, 3);

    let train = prepare(synthetic_split(2), shape, 2, 2).unwrap();
    let validation = prepare(synthetic_split(2), shape, 2, 2).unwrap();
    let mut compiled = select_model::<TestBackend>("mobilenet", &ctx, &device).unwrap();
    let before = weight_bytes(&compiled.model);

    let history = fit(&mut compiled, &train, &validation, &ctx, &device).unwrap();

    assert_eq!(history.len(), 1);
    assert!(history.last().unwrap().train.loss().unwrap().is_finite());
    assert_ne!(weight_bytes(&compiled.model), before);

    let checkpoint_dir = dir.path().join("checkpoints/20210803-120000");
    assert!(checkpoint_dir.join("model.ckpt").is_file());
    let info = CheckpointInfo::load(&checkpoint_dir.join("checkpoint.json")).unwrap();
    assert_eq!(info.epoch, 1);
    assert_eq!(info.run_id, "20210803-120000");

    let log_dir = dir.path().join("logs/fit/20210803-120000");
    assert!(log_dir.is_dir());
    assert!(log_dir.join("train/histograms.jsonl").is_file());
    assert!(log_dir.join("metrics.csv").is_file());

    let scalars: Vec<ScalarEvent> = read_events(&log_dir.join("validation/scalars.jsonl")).unwrap();
    assert!(scalars.iter().any(|e| e.tag == "epoch_loss"));
    assert!(scalars.iter().any(|e| e.tag == "epoch_accuracy"));
}

#[test]
fn test_frozen_backbone_keeps_weights_while_head_trains() {
    let dir = tempfile::tempdir().unwrap();
    let shape = InputShape::new(64, 64, 3);
    let mut config = small_config(dir.path());
    // AlexNet has no batch-norm running statistics
    config.model.architecture = Architecture::AlexNet;
    config.model.input_shape = shape;
    config.model.freeze_backbone = true;
    let ctx = context(config, "frozen-fit");
    let device = Default::default();

    let train = prepare(synthetic_split(2), shape, 2, 2).unwrap();
    let mut compiled = select_model::<TestBackend>("alexnet", &ctx, &device).unwrap();
    let backbone_before = record_bytes(&compiled.model.backbone);
    let head_before = record_bytes(&compiled.model.head);

    fit(&mut compiled, &train, &train, &ctx, &device).unwrap();

    assert_eq!(record_bytes(&compiled.model.backbone), backbone_before);
    assert_ne!(record_bytes(&compiled.model.head), head_before);
}

#[test]
fn test_checkpoint_restores_weights() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(small_config(dir.path()), "restore");
    let device = Default::default();
    let shape = InputShape::new(32, 32, 3);

    let train = prepare(synthetic_split(2), shape, 2, 2).unwrap();
    let mut compiled = select_model::<TestBackend>("mobilenet", &ctx, &device).unwrap();
    fit(&mut compiled, &train, &train, &ctx, &device).unwrap();

    let fresh = DogBreedClassifier::<TestBackend>::new(compiled.architecture, 2, 0.2, &device);
    let restored = CheckpointSink::new(&ctx.paths)
        .load_weights(fresh, &device)
        .unwrap();

    assert_eq!(weight_bytes(&restored), weight_bytes(&compiled.model));
}

#[test]
fn test_evaluation_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = small_config(dir.path());
    config.model.metrics.push(dogbreed_core::MetricKind::TopKAccuracy(1));
    let ctx = context(config, "eval");
    let device = Default::default();

    let test = prepare(synthetic_split(3), InputShape::new(32, 32, 3), 2, 2).unwrap();
    let compiled = select_model::<TestBackend>("mobilenet", &ctx, &device).unwrap();
    let before = weight_bytes(&compiled.model);

    let first = evaluate(&compiled, &test).unwrap();
    let second = evaluate(&compiled, &test).unwrap();

    assert_eq!(first, second);
    assert_eq!(weight_bytes(&compiled.model), before);
    assert!(first.get(LOSS).unwrap().is_finite());
    assert_eq!(first.get("accuracy"), first.get("top_1_accuracy"));
    assert_eq!(first.lines().len(), 3);
}

#[test]
fn test_evaluation_rejects_empty_split() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = context(small_config(dir.path()), "empty");
    let device = Default::default();

    let empty = prepare(synthetic_split(0), InputShape::new(32, 32, 3), 2, 2).unwrap();
    let compiled = select_model::<TestBackend>("mobilenet", &ctx, &device).unwrap();

    assert!(matches!(evaluate(&compiled, &empty), Err(Error::Dataset(_))));
}

#[test]
fn test_end_to_end_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("data");
    write_dataset(&data_dir, 2, 1);

    let mut config = small_config(dir.path());
    config.training.seed = 0;
    config.training.evaluate = true;
    config.data.data_dir = data_dir;
    let ctx = context(config, "e2e");
    let device = Default::default();

    let outcome = pipeline::run_from_disk::<TestBackend>(&ctx, &device).unwrap();

    assert_eq!(outcome.history.len(), 1);
    assert!(outcome.evaluation.unwrap().loss().unwrap().is_finite());

    let save_dir = dir.path().join("trained_models/mobilenet_1");
    assert_eq!(outcome.save_dir, save_dir);
    assert!(save_dir.join("model.mpk").is_file());
    assert!(save_dir.join("model.json").is_file());
    assert!(save_dir.join("config.toml").is_file());

    let loaded = load_model::<TestBackend>(&save_dir, &device).unwrap();
    assert_eq!(loaded.architecture, outcome.saved.architecture);
    assert_eq!(loaded.num_classes, 2);

    let (_, test, _) = dogbreed_dataset::load(&ctx.config.data.data_dir).unwrap();
    let test = prepare(test, loaded.input_shape, 2, 2).unwrap();
    let report = evaluate(&loaded, &test).unwrap();
    assert!(report.loss().unwrap().is_finite());
}

#[test]
fn test_warm_start_from_saved_model() {
    let dir = tempfile::tempdir().unwrap();
    let device = Default::default();
    let ctx = context(small_config(dir.path()), "base");

    let compiled = select_model::<TestBackend>("mobilenet", &ctx, &device).unwrap();
    let saved_dir = dir.path().join("trained_models/base");
    save_model(&compiled, &saved_dir, Some(&ctx)).unwrap();

    let mut config = small_config(dir.path());
    config.model.pretrained = Some(saved_dir.clone());
    let warm = select_model::<TestBackend>("mobilenet", &context(config, "warm"), &device).unwrap();
    assert_eq!(weight_bytes(&warm.model), weight_bytes(&compiled.model));

    let mut config = small_config(dir.path());
    config.model.num_classes = 3;
    config.model.pretrained = Some(saved_dir);
    let err = select_model::<TestBackend>("mobilenet", &context(config, "bad"), &device).unwrap_err();
    assert!(matches!(err, Error::Model(_)));
}
