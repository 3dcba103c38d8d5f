use std::{io::Cursor, path::PathBuf, process::Command};

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "affirmer_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_affirmer")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "affirmer.exe"
            } else {
                "affirmer"
            });
            p
        })
}

fn write_png(path: &std::path::Path) {
    let img = image::RgbaImage::from_pixel(160, 90, image::Rgba([30, 90, 60, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    std::fs::write(path, buf).unwrap();
}

#[test]
fn cli_render_writes_image() {
    let dir = temp_dir("cli_render");
    std::fs::create_dir_all(&dir).unwrap();
    let base = dir.join("base.png");
    write_png(&base);
    let out = dir.join("nested").join("card.jpg");

    let status = Command::new(exe())
        .arg("render")
        .arg("--base")
        .arg(&base)
        .args(["--text", "I am worthy.", "--size", "24", "--color", "#FFD700"])
        .arg("--out")
        .arg(&out)
        .status()
        .unwrap();

    assert!(status.success());
    let img = image::open(&out).unwrap();
    assert_eq!((img.width(), img.height()), (160, 90));
}

#[test]
fn cli_batch_reports_failures_with_exit_code() {
    let dir = temp_dir("cli_batch");
    let bases = dir.join("bases");
    std::fs::create_dir_all(&bases).unwrap();
    write_png(&bases.join("a.png"));
    let out_dir = dir.join("out");

    let status = Command::new(exe())
        .arg("batch")
        .arg("--bases")
        .arg(&bases)
        .arg("--out-dir")
        .arg(&out_dir)
        .args(["--text", "I am calm.", "--text", "I am kind.", "--parallel"])
        .status()
        .unwrap();
    assert!(status.success());
    assert!(out_dir.join("affirmation_001.png").exists());
    assert!(out_dir.join("affirmation_002.png").exists());

    std::fs::write(bases.join("b.png"), b"broken").unwrap();
    let status = Command::new(exe())
        .arg("batch")
        .arg("--bases")
        .arg(&bases)
        .arg("--out-dir")
        .arg(&out_dir)
        .args(["--text", "I am calm.", "--all", "--prefix", "all_"])
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(out_dir.join("all_001.png").exists());
    assert!(!out_dir.join("all_002.png").exists());
}

#[test]
fn cli_discover_and_font_info_print_to_stdout() {
    let dir = temp_dir("cli_discover");
    std::fs::create_dir_all(&dir).unwrap();
    write_png(&dir.join("one.png"));
    std::fs::write(dir.join("skip.txt"), b"x").unwrap();

    let output = Command::new(exe()).arg("discover").arg(&dir).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("one.png"));

    let output = Command::new(exe()).arg("font-info").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("family: DejaVu Sans"));
    let sha = stdout
        .lines()
        .find_map(|l| l.strip_prefix("sha256: "))
        .unwrap();
    assert_eq!(sha.len(), 64);
}
