use sales_pipeline::config::{Backend, StoreConfig};
use sales_pipeline::{Bucket, ObjectKeys, PipelineError, Stage, StageRunner};

const RAW: &str = "\
1,Widget,5,2.50,north
2,Gizmo,x,3.00,south
3,Gadget,10,4.00,east
4,Widget,7,2.75,west
5,Bolt,1,0.10,north
6,Nut,,0.05,south
7,Gadget,1,4.20,east
";

async fn text(bucket: &Bucket, key: &str) -> String {
    String::from_utf8(bucket.get(key).await.unwrap()).unwrap()
}

async fn seeded_runner(objects: &[(&str, &str)]) -> StageRunner {
    let bucket = Bucket::in_memory();
    for (key, body) in objects {
        bucket.put(key, body.as_bytes().to_vec()).await.unwrap();
    }
    StageRunner::new(bucket, ObjectKeys::default())
}

#[tokio::test]
async fn full_pipeline_produces_every_object() {
    let runner = seeded_runner(&[("Dataset.csv", RAW)]).await;

    let reports = runner.run_all().await.unwrap();
    let stages: Vec<Stage> = reports.iter().map(|r| r.stage).collect();
    assert_eq!(stages, Stage::ALL);
    assert_eq!(reports[0].rows_read, 7);
    assert_eq!(reports[0].rows_written, 5);

    let bucket = runner.bucket();
    assert_eq!(
        text(bucket, "Preprocessed.csv").await,
        "1,Widget,5,2.50,north\n3,Gadget,10,4.00,east\n4,Widget,7,2.75,west\n5,Bolt,1,0.10,north\n7,Gadget,1,4.20,east\n"
    );
    assert_eq!(
        text(bucket, "salesM.csv").await,
        "Widget,5,2.50\nGadget,10,4.00\nWidget,7,2.75\nBolt,1,0.10\nGadget,1,4.20\n"
    );
    assert_eq!(text(bucket, "Reduced.csv").await, "Widget,12\nGadget,11\nBolt,1\n");
    assert_eq!(
        text(bucket, "Top_Products_Price.csv").await,
        "Widget,2.75\nGadget,4.2\nBolt,0.1\n"
    );
    assert_eq!(
        text(bucket, "Final_Output.csv").await,
        "Widget,3.025\nGadget,4.2\nBolt,0.1\n"
    );
}

#[tokio::test]
async fn deciles_are_applied_by_rank_position() {
    let mapped: String = (0..10)
        .map(|i| format!("p{i},{},{}\n", 100 - i * 10, (i + 1) * 10))
        .collect();
    let runner = seeded_runner(&[("salesM.csv", mapped.as_str())]).await;

    runner.run(Stage::Reduce).await.unwrap();
    runner.run(Stage::UpdatePrice).await.unwrap();

    assert_eq!(
        text(runner.bucket(), "Final_Output.csv").await,
        "p0,11\np1,22\np2,30\np3,40\np4,50\np5,60\np6,70\np7,80\np8,81\np9,90\n"
    );
}

#[tokio::test]
async fn rerunning_the_pipeline_is_refused() {
    let runner = seeded_runner(&[("Dataset.csv", RAW)]).await;
    runner.run_all().await.unwrap();
    let before = text(runner.bucket(), "Final_Output.csv").await;

    for stage in Stage::ALL {
        let err = runner.run(stage).await.unwrap_err();
        assert!(
            matches!(err, PipelineError::OutputAlreadyExists { stage: ref name, .. } if name == stage.as_str()),
            "{stage}: {err}"
        );
    }
    assert_eq!(text(runner.bucket(), "Final_Output.csv").await, before);
}

#[tokio::test]
async fn run_all_stops_at_missing_dataset() {
    let runner = seeded_runner(&[]).await;

    let err = runner.run_all().await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingInput { ref key, .. } if key == "Dataset.csv"));
    assert!(runner.bucket().keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn stages_can_resume_from_an_intermediate_object() {
    let runner = seeded_runner(&[("Preprocessed.csv", "9,Nut,4,0.05\n9,Bolt,4,0.10\n")]).await;

    let err = runner.run(Stage::Preprocess).await.unwrap_err();
    assert!(matches!(err, PipelineError::MissingInput { .. }));

    runner.run(Stage::Map).await.unwrap();
    runner.run(Stage::Reduce).await.unwrap();
    assert_eq!(text(runner.bucket(), "Reduced.csv").await, "Nut,4\nBolt,4\n");
}

#[tokio::test]
async fn local_directory_backend() {
    let dir = tempfile::tempdir().unwrap();
    let store = StoreConfig {
        bucket: "local".into(),
        backend: Backend::Local {
            root: dir.path().to_path_buf(),
        },
    };
    let bucket = Bucket::connect(&store).unwrap();
    bucket.put("Dataset.csv", RAW.as_bytes().to_vec()).await.unwrap();

    let runner = StageRunner::new(bucket, ObjectKeys::default());
    runner.run_all().await.unwrap();

    let on_disk = std::fs::read_to_string(dir.path().join("Final_Output.csv")).unwrap();
    assert_eq!(on_disk, "Widget,3.025\nGadget,4.2\nBolt,0.1\n");
    assert_eq!(runner.bucket().keys().await.unwrap().len(), 6);
}

#[tokio::test]
async fn latin1_names_flow_through_every_stage() {
    let bucket = Bucket::in_memory();
    bucket
        .put(
            "Dataset.csv",
            b"1,Caf\xE9,4,2.00,nord\n2,Th\xE9,x,1.00,sud\n3,Caf\xE9,1,3.00,est\n4,Pain,2,1.50,ouest\n"
                .to_vec(),
        )
        .await
        .unwrap();
    let runner = StageRunner::new(bucket, ObjectKeys::default());

    let reports = runner.run_all().await.unwrap();
    assert_eq!(reports[0].rows_written, 3);

    let bucket = runner.bucket();
    assert_eq!(
        bucket.get("Reduced.csv").await.unwrap(),
        b"Caf\xE9,5\nPain,2\n".to_vec()
    );
    assert_eq!(
        bucket.get("Final_Output.csv").await.unwrap(),
        b"Caf\xE9,3.3\nPain,1.5\n".to_vec()
    );
}
