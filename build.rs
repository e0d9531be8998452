use std::path::{Path, PathBuf};
use std::process::Command;
use std::{env, fs};

// Files without one of these extensions are includes and only get compiled through a stage
const SHADER_STAGE_EXTENSIONS: [&str; 6] = ["rgen", "rmiss", "rchit", "rahit", "rint", "rcall"];

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap()).join("shaders");
    fs::create_dir_all(&out_dir).unwrap();

    let input_path = PathBuf::from("assets/shaders/");
    println!("cargo:rerun-if-changed={}", input_path.to_string_lossy());

    match fs::read_dir(&input_path) {
        Ok(paths) => compile_shaders(paths, PathBuf::new(), &out_dir),
        Err(error) => println!(
            "cargo:warning=Could not read {}: {}",
            input_path.to_string_lossy(),
            error
        ),
    }
}

fn compile_shaders(paths: fs::ReadDir, parent_path: PathBuf, out_dir: &Path) {
    for entry in paths {
        let entry = match entry {
            Ok(path) => path,
            Err(_) => continue,
        };
        let shader_file_name = entry.file_name();
        let shader_path = entry.path();
        if shader_path.is_dir() {
            let mut child_path = parent_path.clone();
            child_path.push(shader_file_name);
            if let Ok(paths) = fs::read_dir(shader_path) {
                compile_shaders(paths, child_path, out_dir);
            }
            continue;
        }
        let is_stage = shader_path
            .extension()
            .map(|extension| SHADER_STAGE_EXTENSIONS.iter().any(|stage| extension == *stage))
            .unwrap_or(false);
        if !shader_path.is_file() || !is_stage {
            continue;
        }

        let mut output_file_name = shader_file_name.clone();
        output_file_name.push(".spv");
        let output_dir = out_dir.join(&parent_path);
        if fs::create_dir_all(&output_dir).is_err() {
            continue;
        }
        let output_path = output_dir.join(&output_file_name);

        let shader_file_name = shader_file_name.to_string_lossy();
        let shader_compile_result = Command::new("glslc")
            .arg("--target-env=vulkan1.3")
            .arg(&shader_path)
            .arg("-o")
            .arg(&output_path)
            .status();

        // A missing compiler should not break the build, the renderer reports the missing
        // SPIR-V file when it starts instead
        match shader_compile_result {
            Ok(status) if status.success() => {}
            Ok(status) => println!(
                "cargo:warning=Shader compilation for {} failed: {}",
                shader_file_name, status
            ),
            Err(error) => println!(
                "cargo:warning=Could not run glslc for {}: {}",
                shader_file_name, error
            ),
        }
    }
}
