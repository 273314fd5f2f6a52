//! Entrypoint for CLI
use std::{
    env,
    error::Error,
    fs, io,
    path::{Path, PathBuf},
};

use jack::{prelude::*, write_tokens_xml, IMPL_VERSION};
use log::{debug, error, info, LevelFilter};

static USAGE: &str = r#"
usage: jackc CMD PATH [--config FILE]

commands:
    compile   Compile a .jack file, or every .jack file under a directory, into .vm files
    tokens    Write the tokens of each .jack file to a .tokenized.xml file

options:
    --config FILE   YAML compiler configuration

examples:
    jackc compile Square/
    jackc compile Main.jack --config jack.yaml
    jackc tokens Main.jack
"#;

fn main() -> Result<(), Box<dyn Error>> {
    simple_logger::SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    let (cmd, options) = match parse_args() {
        Some(args) => args,
        None => {
            print_usage();
            // FreeBSD EX_USAGE (64)
            std::process::exit(64)
        }
    };

    let conf = match options.config {
        Some(filepath) => load_conf(filepath)?,
        None => CompileConf::default(),
    };
    debug!("{conf:?}");

    let failures = match cmd {
        Cmd::Compile { path } => run_on_sources(path, |file| compile_file(file, &conf))?,
        Cmd::Tokens { path } => run_on_sources(path, tokenize_file)?,
    };

    if failures > 0 {
        error!("{failures} file(s) failed");
        std::process::exit(1)
    }

    Ok(())
}

fn load_conf(filepath: impl AsRef<Path>) -> JackResult<CompileConf> {
    let file = fs::File::open(filepath.as_ref())?;
    read_conf(file)
}

fn read_conf(reader: impl io::Read) -> JackResult<CompileConf> {
    serde_yaml::from_reader(reader).map_err(|err| JackError::Config(err.to_string()))
}

/// Run the given job on every source file found at the path.
///
/// A failing file is logged and skipped. Returns the number of failures.
fn run_on_sources(
    path: impl AsRef<Path>,
    mut job: impl FnMut(&Path) -> JackResult<()>,
) -> JackResult<usize> {
    let mut files = vec![];
    find_sources(path.as_ref(), &mut files)?;

    if files.is_empty() {
        info!("no .jack files found in {}", path.as_ref().display());
    }

    let mut failures = 0;
    for file in files {
        if let Err(err) = job(&file) {
            error!("{}\n{err}", file.display());
            failures += 1;
        }
    }

    Ok(failures)
}

/// Collect the `.jack` files at the path, searching directories recursively.
fn find_sources(path: &Path, files: &mut Vec<PathBuf>) -> JackResult<()> {
    if !path.is_dir() {
        files.push(path.to_path_buf());
        return Ok(());
    }

    let mut entries = fs::read_dir(path)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.sort();

    for entry in entries {
        if entry.is_dir() {
            find_sources(&entry, files)?;
        } else if entry.extension().map(|ext| ext == "jack").unwrap_or(false) {
            files.push(entry);
        }
    }

    Ok(())
}

fn read_source(filepath: &Path) -> JackResult<String> {
    let file_bytes = fs::read(filepath)?;
    Ok(String::from_utf8(file_bytes)?)
}

fn compile_file(filepath: &Path, conf: &CompileConf) -> JackResult<()> {
    info!("compiling {}", filepath.display());

    let source_code = read_source(filepath)?;

    // Output only exists once the whole class compiled.
    let code = compile_to_string(&source_code, conf.clone())?;

    let outpath = filepath.with_extension("vm");
    fs::write(&outpath, code)?;
    info!("wrote {}", outpath.display());

    Ok(())
}

fn tokenize_file(filepath: &Path) -> JackResult<()> {
    info!("tokenizing {}", filepath.display());

    let source_code = read_source(filepath)?;

    let mut xml = String::new();
    write_tokens_xml(&mut xml, &source_code)?;

    let mut outpath = filepath.as_os_str().to_owned();
    outpath.push(".tokenized.xml");
    fs::write(&outpath, xml)?;
    info!("wrote {}", Path::new(&outpath).display());

    Ok(())
}

fn parse_args() -> Option<(Cmd, Options)> {
    let mut args = env::args().skip(1);
    let mut options = Options::default();

    let cmd = match args.next()?.as_str() {
        "compile" => Cmd::Compile {
            path: consume_arg(&mut args)?,
        },
        "tokens" => Cmd::Tokens {
            path: consume_arg(&mut args)?,
        },
        _ => return None,
    };

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => options.config = Some(consume_arg(&mut args)?),
            _ => return None,
        }
    }

    Some((cmd, options))
}

/// Consumes the next argument, if it exists.
fn consume_arg(args: &mut impl Iterator<Item = String>) -> Option<String> {
    args.next()
}

fn print_usage() {
    println!("Jack compiler v{IMPL_VERSION}");
    println!("{USAGE}");
}

enum Cmd {
    /// Compile to VM code
    Compile { path: String },
    /// Dump tokens as XML
    Tokens { path: String },
}

#[derive(Default)]
struct Options {
    config: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;
    use jack::Redefinition;

    #[test]
    fn test_read_conf() {
        let conf = read_conf("redefinition: shadow\n".as_bytes()).unwrap();
        assert_eq!(conf.redefinition, Redefinition::Shadow);

        let conf = read_conf("redefinition: reject\n".as_bytes()).unwrap();
        assert_eq!(conf.redefinition, Redefinition::Reject);

        // Missing keys fall back to the defaults.
        let conf = read_conf("{}".as_bytes()).unwrap();
        assert_eq!(conf.redefinition, Redefinition::Reject);
    }

    #[test]
    fn test_read_conf_unknown_variant() {
        let err = read_conf("redefinition: ignore\n".as_bytes()).unwrap_err();
        assert!(matches!(err, JackError::Config(_)), "{}", err);
    }
}
