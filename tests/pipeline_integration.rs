//! End-to-end tests for a batch run against a temporary template directory

use std::fs;
use std::path::{Path, PathBuf};

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use svg_colorways::raster::{RasterError, RasterFailure, RasterOutcome};
use svg_colorways::{
    generate, GenerateError, GenerateOptions, MutationMode, Rasterizer, Silent, Template,
};

const SVG: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><rect id="bg" style="fill:#ff0000"/><circle id="dot" r="2"/></svg>"#;

/// Writes the SVG it receives to the destination; fails for chosen files
#[derive(Default)]
struct Recorder {
    calls: Vec<(String, PathBuf)>,
    fail_on: Vec<String>,
}

impl Rasterizer for Recorder {
    fn rasterize(&mut self, svg: &[u8], dest: &Path) -> Result<RasterOutcome, RasterError> {
        let svg = String::from_utf8_lossy(svg).into_owned();
        self.calls.push((svg.clone(), dest.to_path_buf()));

        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_on.contains(&name) {
            return Ok(RasterOutcome::Failed(RasterFailure {
                code: Some(1),
                stdout: String::new(),
                stderr: "cannot export".to_string(),
            }));
        }
        fs::write(dest, svg).unwrap();
        Ok(RasterOutcome::Written)
    }
}

struct Workspace {
    root: TempDir,
}

impl Workspace {
    fn new(name: &str, config: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("templates").join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.toml"), config).unwrap();
        fs::write(dir.join("base.svg"), SVG).unwrap();
        Self { root }
    }

    fn template_dir(&self, name: &str) -> PathBuf {
        self.root.path().join("templates").join(name)
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions::new()
            .with_pngs_dir(self.root.path().join("pngs"))
            .with_docs_dir(self.root.path().join("docs"))
    }

    fn pngs(&self) -> PathBuf {
        self.root.path().join("pngs")
    }

    fn docs(&self) -> PathBuf {
        self.root.path().join("docs")
    }
}

const SINGLE_SLOT: &str = r##"
file_prefix = "logo"
namespace = "http://www.w3.org/2000/svg"

[palette.primary]
red = "#ff0000"
blue = "#0000ff"

[attribute.background]
name = "{color_key}"
xpath = ".//{{{namespace}}}rect"
style = "fill:{color_value}"

[[style]]
name = "Background"
attribute = [{ id = "background", palette = "primary" }]
"##;

const TWO_SLOTS: &str = r##"
file_prefix = "logo"
namespace = "http://www.w3.org/2000/svg"

[palette.primary]
red = "#ff0000"
blue = "#0000ff"

[palette.mono]
black = "#000000"
white = "#ffffff"
grey = "#808080"

[attribute.background]
name = "{color_key}"
xpath = ".//{{{namespace}}}rect"
style = "fill:{color_value}"

[attribute.dot]
name = "{color_key}_dot"
xpath = ".//{{{namespace}}}circle[@id='dot']"
style = "fill:{color_value};stroke:none"

[[style]]
name = "Background and dot"
attribute = [
    { id = "background", palette = "primary" },
    { id = "dot", palette = "mono" },
]
"##;

fn file_names(recorder: &Recorder) -> Vec<String> {
    recorder
        .calls
        .iter()
        .map(|(_, dest)| dest.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_single_slot_generates_one_image_per_color() {
    let ws = Workspace::new("logo", SINGLE_SLOT);
    let template = Template::load(&ws.template_dir("logo")).unwrap();
    let mut recorder = Recorder::default();

    let summary = generate(&template, &ws.options(), &mut recorder, &mut Silent).unwrap();

    assert_eq!(summary.rendered, 2);
    assert!(summary.failures.is_empty());
    assert_eq!(file_names(&recorder), vec!["logo-red.png", "logo-blue.png"]);

    let blue = fs::read_to_string(ws.pngs().join("logo").join("logo-blue.png")).unwrap();
    assert_eq!(
        blue,
        r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><rect id="bg" style="fill:#0000ff"/><circle id="dot" r="2"/></svg>"##
    );

    let report = fs::read_to_string(ws.docs().join("logo.md")).unwrap();
    assert_eq!(summary.report_path, ws.docs().join("logo.md"));
    assert!(report.starts_with("# Logo\n## Background\n"));
    assert_eq!(report.matches("<img").count(), 2);
    assert!(report.contains(r#"<img src="../../assets/pngs/logo/logo-red.png">"#));
    assert!(report.contains("See [here](../../assets/pngs/logo) for all png's."));
}

#[test]
fn test_two_slots_enumerate_first_slot_outermost() {
    let ws = Workspace::new("logo", TWO_SLOTS);
    let template = Template::load(&ws.template_dir("logo")).unwrap();
    let mut recorder = Recorder::default();

    let summary = generate(&template, &ws.options(), &mut recorder, &mut Silent).unwrap();

    assert_eq!(summary.rendered, 6);
    assert_eq!(
        file_names(&recorder),
        vec![
            "logo-red-black_dot.png",
            "logo-red-white_dot.png",
            "logo-red-grey_dot.png",
            "logo-blue-black_dot.png",
            "logo-blue-white_dot.png",
            "logo-blue-grey_dot.png",
        ]
    );

    let (svg, _) = &recorder.calls[4];
    assert!(svg.contains(r##"<rect id="bg" style="fill:#0000ff"/>"##));
    assert!(svg.contains(r##"<circle id="dot" r="2" style="fill:#ffffff;stroke:none"/>"##));

    let report = fs::read_to_string(ws.docs().join("logo.md")).unwrap();
    assert_eq!(report.matches("<tr>").count(), 2);
    assert!(report.contains(r#"<td align="center">blue, white_dot<img"#));
}

#[test]
fn test_failed_rasterization_does_not_stop_the_batch() {
    let ws = Workspace::new("logo", TWO_SLOTS);
    let template = Template::load(&ws.template_dir("logo")).unwrap();
    let mut recorder = Recorder {
        fail_on: vec!["logo-red-white_dot.png".to_string()],
        ..Recorder::default()
    };

    let summary = generate(&template, &ws.options(), &mut recorder, &mut Silent).unwrap();

    assert_eq!(recorder.calls.len(), 6);
    assert_eq!(summary.rendered, 5);
    assert_eq!(
        summary.failures,
        vec![ws.pngs().join("logo").join("logo-red-white_dot.png")]
    );
    // the report still lists every combination
    let report = fs::read_to_string(ws.docs().join("logo.md")).unwrap();
    assert_eq!(report.matches("<img").count(), 6);
}

const SELF_SELECTING: &str = r##"
file_prefix = "logo"
namespace = "http://www.w3.org/2000/svg"

[palette.primary]
red = "#ff0000"
blue = "#0000ff"
green = "#00ff00"

[attribute.background]
name = "{color_key}"
xpath = ".//{{{namespace}}}rect[@style='fill:#ff0000']"
style = "fill:{color_value}"

[[style]]
name = "Background"
attribute = [{ id = "background", palette = "primary" }]
"##;

fn rect_fills(recorder: &Recorder) -> Vec<String> {
    recorder
        .calls
        .iter()
        .map(|(svg, _)| {
            let start = svg.find("<rect").unwrap();
            let end = start + svg[start..].find("/>").unwrap();
            svg[start..end].to_string()
        })
        .collect()
}

#[test]
fn test_fresh_mode_starts_every_combination_from_the_template() {
    let ws = Workspace::new("logo", SELF_SELECTING);
    let template = Template::load(&ws.template_dir("logo")).unwrap();
    let mut recorder = Recorder::default();

    generate(&template, &ws.options(), &mut recorder, &mut Silent).unwrap();

    assert_eq!(
        rect_fills(&recorder),
        vec![
            r##"<rect id="bg" style="fill:#ff0000""##,
            r##"<rect id="bg" style="fill:#0000ff""##,
            r##"<rect id="bg" style="fill:#00ff00""##,
        ]
    );
}

#[test]
fn test_cumulative_mode_carries_changes_forward() {
    let ws = Workspace::new("logo", SELF_SELECTING);
    let template = Template::load(&ws.template_dir("logo")).unwrap();
    let mut recorder = Recorder::default();
    let options = ws.options().with_mutation(MutationMode::Cumulative);

    generate(&template, &options, &mut recorder, &mut Silent).unwrap();

    // once blue, the rect no longer matches the path
    assert_eq!(
        rect_fills(&recorder),
        vec![
            r##"<rect id="bg" style="fill:#ff0000""##,
            r##"<rect id="bg" style="fill:#0000ff""##,
            r##"<rect id="bg" style="fill:#0000ff""##,
        ]
    );
}

#[test]
fn test_cumulative_mode_from_config() {
    let config = format!("{}\n[output]\nmutation = \"cumulative\"\n", SELF_SELECTING);
    let ws = Workspace::new("logo", &config);
    let template = Template::load(&ws.template_dir("logo")).unwrap();
    assert_eq!(template.config.output.mutation, MutationMode::Cumulative);

    let mut recorder = Recorder::default();
    generate(&template, &ws.options(), &mut recorder, &mut Silent).unwrap();
    assert!(rect_fills(&recorder)[2].contains("#0000ff"));
}

#[test]
fn test_output_settings_change_report_layout() {
    let config = format!(
        "{}\n[output]\ncolumns = 1\nimage_url_prefix = \"img/\"\n",
        SINGLE_SLOT
    );
    let ws = Workspace::new("logo", &config);
    let template = Template::load(&ws.template_dir("logo")).unwrap();

    generate(&template, &ws.options(), &mut Recorder::default(), &mut Silent).unwrap();

    let report = fs::read_to_string(ws.docs().join("logo.md")).unwrap();
    assert_eq!(report.matches("<tr>").count(), 2);
    assert!(report.contains(r#"<img src="img/logo/logo-blue.png">"#));
}

#[test]
fn test_missing_template_file_is_fatal() {
    let ws = Workspace::new("logo", SINGLE_SLOT);
    fs::remove_file(ws.template_dir("logo").join("base.svg")).unwrap();

    let err = Template::load(&ws.template_dir("logo")).unwrap_err();
    assert!(matches!(err, GenerateError::Template(_)));
}

#[test]
fn test_unknown_palette_is_rejected_at_load() {
    let config = SINGLE_SLOT.replace(r#"palette = "primary""#, r#"palette = "neon""#);
    let ws = Workspace::new("logo", &config);

    let err = Template::load(&ws.template_dir("logo")).unwrap_err();
    assert!(err.to_string().contains("neon"));
}

#[cfg(unix)]
#[test]
fn test_pipe_command_receives_document_on_stdin() {
    use svg_colorways::raster::PipeCommand;

    let ws = Workspace::new("logo", SINGLE_SLOT);
    let template = Template::load(&ws.template_dir("logo")).unwrap();
    let mut copy = PipeCommand::new("sh").arg("-c").arg(r#"cat > "$0""#);

    let summary = generate(&template, &ws.options(), &mut copy, &mut Silent).unwrap();

    assert_eq!(summary.rendered, 2);
    let red = fs::read_to_string(ws.pngs().join("logo").join("logo-red.png")).unwrap();
    assert!(red.contains(r##"style="fill:#ff0000""##));
}
