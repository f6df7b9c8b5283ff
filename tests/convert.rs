//! Whole-pipeline conversions with mock generator, rasterizer and compiler.

mod common;

use common::{
    write_fake_pdf, write_png, FakeCompiler, FakeRasterizer, MissingCompiler, RecordingProgress,
    ScriptedGenerator,
};
use snaptex::{
    ConversionConfig, ConversionProgressCallback, Converter, ItemKind, SnapTexError, SourceSpec,
};
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn config(generator: Arc<ScriptedGenerator>, output_dir: &Path) -> ConversionConfig {
    ConversionConfig::builder()
        .generator(generator)
        .max_workers(5)
        .pacing_delay(Duration::ZERO)
        .output_dir(output_dir)
        .compile(false)
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn three_images_assemble_in_list_order() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let paths = vec![
        write_png(input.path(), "a.png"),
        write_png(input.path(), "b.png"),
        write_png(input.path(), "c.png"),
    ];

    let generator = Arc::new(ScriptedGenerator::new().delay("a", 60).delay("b", 30));
    let output = Converter::new(config(generator, out.path()))
        .unwrap()
        .convert(SourceSpec::PathList(paths))
        .await
        .unwrap();

    let (tex, pdf) = output.paths();
    assert_eq!(tex, out.path().join("batch_output.tex"));
    assert!(pdf.is_none());
    assert!(output.latex.contains("\\begin{document}\n\nA\n\nB\n\nC\n\n\\end{document}"));
    assert_eq!(std::fs::read_to_string(tex).unwrap(), output.latex);
    assert!(output.items.iter().all(|r| r.kind == ItemKind::BatchImage));
    assert_eq!(output.stats.total_items, 3);
    assert_eq!(output.stats.succeeded_items, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pdf_pages_completing_out_of_order_assemble_in_page_order() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let pdf = write_fake_pdf(input.path(), "lecture.pdf");

    let generator = Arc::new(
        ScriptedGenerator::new()
            .delay("lecture_page_3", 0)
            .delay("lecture_page_1", 40)
            .delay("lecture_page_5", 80)
            .delay("lecture_page_2", 120)
            .delay("lecture_page_4", 160),
    );
    let rasterizer = Arc::new(FakeRasterizer::new(5));
    let output = Converter::new(config(generator.clone(), out.path()))
        .unwrap()
        .with_rasterizer(rasterizer.clone())
        .convert(pdf)
        .await
        .unwrap();

    assert_eq!(
        generator.completed(),
        [
            "lecture_page_3",
            "lecture_page_1",
            "lecture_page_5",
            "lecture_page_2",
            "lecture_page_4"
        ]
    );
    let pages: Vec<usize> = output.items.iter().filter_map(|r| r.page_num()).collect();
    assert_eq!(pages, [1, 2, 3, 4, 5]);

    let body = (1..=5)
        .map(|n| format!("LECTURE_PAGE_{n}"))
        .collect::<Vec<_>>()
        .join("\n\n");
    assert!(output.latex.contains(&body));
    assert_eq!(output.latex_path, out.path().join("lecture.tex"));

    // Rendered pages live only as long as the conversion.
    let work_dirs = rasterizer.out_dirs.lock().unwrap().clone();
    assert_eq!(work_dirs.len(), 1);
    assert!(!work_dirs[0].exists());
}

#[tokio::test]
async fn single_image_uses_its_stem() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let image = write_png(input.path(), "Board.JPG.png");

    let output = Converter::new(config(Arc::new(ScriptedGenerator::new()), out.path()))
        .unwrap()
        .convert(image)
        .await
        .unwrap();

    assert_eq!(output.items.len(), 1);
    assert_eq!(output.items[0].kind, ItemKind::SingleImage);
    assert_eq!(output.items[0].image_index(), Some(1));
    assert_eq!(output.latex_path, out.path().join("Board.JPG.tex"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn failed_item_keeps_its_slot() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let paths = vec![
        write_png(input.path(), "a.png"),
        write_png(input.path(), "b.png"),
        write_png(input.path(), "c.png"),
    ];
    let b_path = paths[1].clone();

    let output = Converter::new(config(Arc::new(ScriptedGenerator::new().fail("b")), out.path()))
        .unwrap()
        .convert(paths)
        .await
        .unwrap();

    assert_eq!(output.stats.failed_items, 1);
    assert_eq!(output.stats.succeeded_items, 2);
    let placeholder = format!("% Error processing {}: ", b_path.display());
    let a = output.latex.find("\nA\n").unwrap();
    let b = output.latex.find(&placeholder).unwrap();
    let c = output.latex.find("\nC\n").unwrap();
    assert!(a < b && b < c);
    assert!(output.clone().into_result().is_err());
}

#[tokio::test]
async fn invalid_input_fails_before_any_model_call() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let good = write_png(input.path(), "good.png");
    let bad = input.path().join("notes.txt");
    std::fs::write(&bad, "hello").unwrap();

    let generator = Arc::new(ScriptedGenerator::new());
    let err = Converter::new(config(generator.clone(), out.path()))
        .unwrap()
        .convert(vec![good, bad])
        .await
        .unwrap_err();

    assert!(matches!(err, SnapTexError::UnsupportedFormat { .. }));
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    assert!(!out.path().join("batch_output.tex").exists());
}

#[tokio::test]
async fn compile_failure_leaves_pdf_absent() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let image = write_png(input.path(), "eq.png");

    let output = Converter::new(config(Arc::new(ScriptedGenerator::new()), out.path()))
        .unwrap()
        .with_compiler(Arc::new(MissingCompiler))
        .convert(image)
        .await
        .unwrap();

    assert!(output.latex_path.exists());
    assert!(output.pdf_path.is_none());
}

#[tokio::test]
async fn compiled_pdf_is_returned() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let image = write_png(input.path(), "eq.png");

    let output = Converter::new(config(Arc::new(ScriptedGenerator::new()), out.path()))
        .unwrap()
        .with_compiler(Arc::new(FakeCompiler))
        .convert(image)
        .await
        .unwrap();

    assert_eq!(output.paths().1, Some(out.path().join("eq.pdf").as_path()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn progress_callback_sees_start_and_completion() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let paths = vec![write_png(input.path(), "x.png"), write_png(input.path(), "y.png")];

    let recorder = Arc::new(RecordingProgress::default());
    let output = Converter::new(config(Arc::new(ScriptedGenerator::new().fail("y")), out.path()))
        .unwrap()
        .convert_with_progress(
            paths,
            Some(recorder.clone() as Arc<dyn ConversionProgressCallback>),
        )
        .await
        .unwrap();

    assert_eq!(output.stats.total_items, 2);
    assert_eq!(*recorder.totals.lock().unwrap(), vec![(2, 0), (2, 1)]);
    assert_eq!(*recorder.progress_calls.lock().unwrap(), vec![1.0]);
}

#[tokio::test]
async fn output_serialises_to_json() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let image = write_png(input.path(), "q.png");

    let output = Converter::new(config(Arc::new(ScriptedGenerator::new()), out.path()))
        .unwrap()
        .convert(image)
        .await
        .unwrap();

    let json = serde_json::to_value(&output).unwrap();
    assert_eq!(json["items"][0]["kind"], "single_image");
    assert_eq!(json["items"][0]["ok"], true);
    assert_eq!(json["stats"]["total_items"], 1);
    assert!(json["pdf_path"].is_null());
}

#[test]
fn unknown_model_type_is_a_setup_error() {
    let config = ConversionConfig::builder()
        .model_type("definitely-not-a-model")
        .build()
        .unwrap();
    let err = Converter::new(config).err().expect("should fail");
    assert!(matches!(err, SnapTexError::UnsupportedModel { .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_batches_sharing_an_output_dir_both_succeed() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let first = vec![write_png(input.path(), "a.png"), write_png(input.path(), "b.png")];
    let second = vec![write_png(input.path(), "c.png"), write_png(input.path(), "d.png")];

    let converter = Arc::new(
        Converter::new(config(Arc::new(ScriptedGenerator::new()), out.path())).unwrap(),
    );
    let (one, two) = tokio::join!(
        converter.convert(SourceSpec::PathList(first)),
        converter.convert(SourceSpec::PathList(second)),
    );

    let (one, two) = (one.unwrap(), two.unwrap());
    assert_eq!(one.latex_path, two.latex_path);
    let on_disk = std::fs::read_to_string(&one.latex_path).unwrap();
    assert!(on_disk == one.latex || on_disk == two.latex);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn isolated_runs_get_their_own_directories() {
    let input = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let first = vec![write_png(input.path(), "a.png"), write_png(input.path(), "b.png")];
    let second = vec![write_png(input.path(), "c.png"), write_png(input.path(), "d.png")];

    let mut cfg = config(Arc::new(ScriptedGenerator::new()), out.path());
    cfg.isolate_runs = true;
    let converter = Arc::new(Converter::new(cfg).unwrap());
    let (one, two) = tokio::join!(
        converter.convert(SourceSpec::PathList(first)),
        converter.convert(SourceSpec::PathList(second)),
    );

    let (one, two) = (one.unwrap(), two.unwrap());
    assert_ne!(one.latex_path, two.latex_path);
    for output in [&one, &two] {
        let run_dir = output.latex_path.parent().unwrap();
        assert_eq!(run_dir.parent().unwrap(), out.path());
        assert!(run_dir
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("batch_output_"));
        assert_eq!(std::fs::read_to_string(&output.latex_path).unwrap(), output.latex);
    }
}
