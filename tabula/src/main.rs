use std::{
    fs,
    io::{self, Write},
    iter::Peekable,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, bail};
use clap::Parser;
use tabula_core::{Config, Tabula, language::ast::Program, script};
use tempfile::NamedTempFile;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const SCRIPT_PREFIX: &str = "#csvss:";
const SCRIPT_FILE_PREFIX: &str = "#csvssfile:";

/// Runs tabula scripts over CSV files
#[derive(Debug, Parser)]
#[command(name = "tabula", version)]
struct Args {
    /// CSV file to read (defaults to stdin)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Script file to run
    #[arg(short, long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Script code to run
    #[arg(short, long, value_name = "CODE")]
    execute: Option<String>,

    /// File to write (defaults to stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Update a CSV file in place
    #[arg(short, long, value_name = "FILE")]
    update: Option<PathBuf>,

    /// Pad columns so the separators line up
    #[arg(short, long)]
    align: bool,

    /// Run `let` statements in dependency order
    #[arg(short = 't', long)]
    sort: bool,

    /// Let EXEC start external commands
    #[arg(long)]
    allow_exec: bool,
}

impl Args {
    fn validate(&self) -> anyhow::Result<()> {
        if self.output.is_some() && self.update.is_some() {
            bail!("conflicting output flags: -o and -u cannot be used together");
        }
        if self.input.is_some() && self.update.is_some() {
            bail!("conflicting input flags: -i and -u cannot be used together");
        }
        if self.script.is_some() && self.execute.is_some() {
            bail!("conflicting script flags: -s and -e cannot be used together");
        }
        if self.input().is_none() && self.script.is_none() && self.execute.is_none() {
            bail!("either script or data has to be read from a file");
        }
        Ok(())
    }

    fn input(&self) -> Option<&Path> {
        self.update.as_deref().or(self.input.as_deref())
    }

    fn config(&self) -> Config {
        Config {
            sort: self.sort,
            allow_exec: self.allow_exec,
        }
    }
}

/// CSV records along with the comment lines the reader skipped
#[derive(Debug, Default, PartialEq)]
struct Document {
    records: Vec<Vec<String>>,
    comments: Comments,
    /// Script text gathered from `#csvss:` and `#csvssfile:` comments
    script: Option<String>,
}

/// Comment lines in source order, each tagged with the index of the record
/// it came before. `None` marks comments after the last record.
type Comments = Vec<(Option<usize>, String)>;

/// Parses a run of non-comment lines and appends its records
fn read_records(chunk: &str, records: &mut Vec<Vec<String>>) -> anyhow::Result<()> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(chunk.as_bytes());
    for record in reader.records() {
        let record = record.context("failed to parse CSV")?;
        records.push(record.iter().map(str::to_string).collect());
    }
    Ok(())
}

impl Document {
    /// Splits CSV text into records and comments. A comment is a line whose
    /// first byte is `#` outside of a quoted field. Script files named in
    /// comments resolve against `dir`.
    fn parse(data: &str, dir: &Path) -> anyhow::Result<Self> {
        let mut records = Vec::new();
        let mut comments = Comments::new();
        let mut script = String::new();
        let mut chunk = String::new();
        let mut quoted = false;

        for line in data.lines() {
            if quoted || !line.starts_with('#') {
                chunk.push_str(line);
                chunk.push('\n');
                quoted ^= line.matches('"').count() % 2 == 1;
                continue;
            }
            read_records(&chunk, &mut records)?;
            chunk.clear();

            if let Some(file) = line.strip_prefix(SCRIPT_FILE_PREFIX) {
                let path = dir.join(file.trim());
                let text = fs::read_to_string(&path)
                    .with_context(|| format!("failed to read script {}", path.display()))?;
                script.push_str(&text);
                script.push('\n');
            } else if let Some(code) = line.strip_prefix(SCRIPT_PREFIX) {
                script.push_str(code.trim());
                script.push('\n');
            }
            comments.push((Some(records.len()), line.trim_end().to_string()));
        }
        read_records(&chunk, &mut records)?;

        let end = Some(records.len());
        for (before, _) in &mut comments {
            if *before == end {
                *before = None;
            }
        }

        Ok(Self {
            records,
            comments,
            script: (!script.is_empty()).then_some(script),
        })
    }
}

/// Writes the pending comments that came before row `index`
fn comments_before<'a>(
    out: &mut impl Write,
    pending: &mut Peekable<impl Iterator<Item = &'a (Option<usize>, String)>>,
    index: usize,
) -> io::Result<()> {
    while let Some((_, comment)) =
        pending.next_if(|(before, _)| before.is_some_and(|before| before <= index))
    {
        writeln!(out, "{comment}")?;
    }
    Ok(())
}

fn write_compact(rows: &[Vec<String>], comments: &Comments) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    let mut pending = comments.iter().peekable();
    for (index, row) in rows.iter().enumerate() {
        writer.flush()?;
        comments_before(writer.get_mut(), &mut pending, index)?;
        writer.write_record(row)?;
    }

    let mut out = writer.into_inner().map_err(|e| e.into_error())?;
    for (_, comment) in pending {
        writeln!(out, "{comment}")?;
    }
    Ok(out)
}

/// A field as the CSV writer would quote it
fn escape(field: &str) -> anyhow::Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_field(field)?;
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn write_aligned(rows: &[Vec<String>], comments: &Comments) -> anyhow::Result<Vec<u8>> {
    let cells = rows
        .iter()
        .map(|row| row.iter().map(|field| escape(field)).collect())
        .collect::<anyhow::Result<Vec<Vec<String>>>>()?;

    let mut widths = Vec::<usize>::new();
    for row in &cells {
        for (col, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            match widths.get_mut(col) {
                Some(max) => *max = (*max).max(width),
                None => widths.push(width),
            }
        }
    }

    let mut out = Vec::new();
    let mut pending = comments.iter().peekable();
    for (index, row) in cells.iter().enumerate() {
        comments_before(&mut out, &mut pending, index)?;
        if let Some((last, init)) = row.split_last() {
            for (cell, &width) in init.iter().zip(&widths) {
                write!(out, "{cell:<width$}, ")?;
            }
            write!(out, "{last}")?;
        }
        writeln!(out)?;
    }
    for (_, comment) in pending {
        writeln!(out, "{comment}")?;
    }
    Ok(out)
}

fn load_program(
    args: &Args,
    tabula: &Tabula,
    embedded: Option<&str>,
    input: Option<&Path>,
) -> anyhow::Result<Program> {
    if let Some(code) = &args.execute {
        return Ok(tabula.parse_source(code)?);
    }
    if let Some(code) = embedded {
        debug!("running the script embedded in the CSV");
        return Ok(script::load_source(code, input)?);
    }
    if let Some(path) = &args.script {
        return Ok(tabula.parse_file(path)?);
    }
    let code = io::read_to_string(io::stdin()).context("failed to read script from stdin")?;
    Ok(tabula.parse_source(&code)?)
}

fn write_output(args: &Args, data: &[u8]) -> anyhow::Result<()> {
    if let Some(path) = &args.update {
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut file = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create a temporary file in {}", dir.display()))?;
        file.write_all(data)
            .context("failed to write the temporary file")?;
        file.persist(path)
            .with_context(|| format!("failed to update {}", path.display()))?;
    } else if let Some(path) = &args.output {
        fs::write(path, data).with_context(|| format!("failed to write {}", path.display()))?;
    } else {
        io::stdout()
            .lock()
            .write_all(data)
            .context("failed to write to stdout")?;
    }
    Ok(())
}

fn run(args: &Args) -> anyhow::Result<()> {
    args.validate()?;

    let input = args.input();
    let data = match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => io::read_to_string(io::stdin()).context("failed to read CSV from stdin")?,
    };
    let dir = match input.and_then(Path::parent) {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let Document {
        records,
        comments,
        script,
    } = Document::parse(&data, dir)?;
    debug!(records = records.len(), comments = comments.len(), "read CSV");

    let tabula = Tabula::new(args.config());
    let program = load_program(args, &tabula, script.as_deref(), input)?;
    let rows = tabula.run(program, records)?;

    let out = match args.align {
        true => write_aligned(&rows, &comments)?,
        false => write_compact(&rows, &comments)?,
    };
    write_output(args, &out)
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tabula=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("tabula").chain(argv.iter().copied())).unwrap()
    }

    fn rows(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(ToString::to_string).collect())
            .collect()
    }

    #[test]
    fn flag_conflicts() {
        let err = args(&["-i", "a.csv", "-o", "b.csv", "-u", "c.csv"])
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "conflicting output flags: -o and -u cannot be used together"
        );

        let err = args(&["-i", "a.csv", "-s", "a.tbl", "-e", "let A1 = 1;"])
            .validate()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "conflicting script flags: -s and -e cannot be used together"
        );

        let err = args(&["-a"]).validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "either script or data has to be read from a file"
        );

        assert!(args(&["-e", "let A1 = 1;"]).validate().is_ok());
        assert!(args(&["-u", "a.csv", "-t", "--allow-exec"]).validate().is_ok());
    }

    #[test]
    fn update_reads_and_writes_the_same_file() {
        let args = args(&["-u", "data.csv", "-t"]);
        assert_eq!(args.input(), Some(Path::new("data.csv")));
        assert_eq!(
            args.config(),
            Config {
                sort: true,
                allow_exec: false
            }
        );
    }

    #[test]
    fn comments_are_kept_apart_from_records() {
        let data = "# header\n1, 2\n#csvss: let C1 = A1 + B1;\n3,4\n";
        let document = Document::parse(data, Path::new(".")).unwrap();
        assert_eq!(document.records, rows(&[&["1", "2"], &["3", "4"]]));
        assert_eq!(
            document.comments,
            vec![
                (Some(0), "# header".to_string()),
                (Some(1), "#csvss: let C1 = A1 + B1;".to_string()),
            ]
        );
        assert_eq!(document.script.as_deref(), Some("let C1 = A1 + B1;\n"));
    }

    #[test]
    fn comments_survive_blank_lines_and_multiline_fields() {
        let data = "a\n\n# one\n\"x\n# not a comment\",b\n\n# two\nc\n# three\n";
        let document = Document::parse(data, Path::new(".")).unwrap();
        assert_eq!(
            document.records,
            rows(&[&["a"], &["x\n# not a comment", "b"], &["c"]])
        );
        assert_eq!(
            document.comments,
            vec![
                (Some(1), "# one".to_string()),
                (Some(2), "# two".to_string()),
                (None, "# three".to_string()),
            ]
        );

        let out = write_compact(&document.records, &document.comments).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "a\n# one\n\"x\n# not a comment\",b\n# two\nc\n# three\n"
        );
    }

    #[test]
    fn only_column_one_hashes_start_comments() {
        let document = Document::parse("  # x, 1\n#y\n", Path::new(".")).unwrap();
        assert_eq!(document.records, rows(&[&["# x", "1"]]));
        assert_eq!(document.comments, vec![(None, "#y".to_string())]);
    }

    #[test]
    fn script_files_resolve_next_to_the_csv() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("calc.tbl"), "let A2 = A1 * 2;").unwrap();
        let data = "#csvssfile: calc.tbl\n#csvss: let A3 = A2 + 1;\n5\n";

        let document = Document::parse(data, dir.path()).unwrap();
        assert_eq!(
            document.script.as_deref(),
            Some("let A2 = A1 * 2;\nlet A3 = A2 + 1;\n")
        );

        let err = Document::parse("#csvssfile: missing.tbl\n", dir.path()).unwrap_err();
        assert!(err.to_string().starts_with("failed to read script "), "{err}");
    }

    #[test]
    fn compact_output_restores_comments() {
        let comments = vec![
            (Some(0), "# head".to_string()),
            (Some(1), "# middle".to_string()),
            (Some(1), "# also middle".to_string()),
            (None, "# tail".to_string()),
        ];
        let out = write_compact(&rows(&[&["1", "2"], &["3", "a,b"]]), &comments).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "# head\n1,2\n# middle\n# also middle\n3,\"a,b\"\n# tail\n"
        );
    }

    #[test]
    fn aligned_output_pads_columns() {
        let comments = vec![(Some(1), "# note".to_string())];
        let out = write_aligned(
            &rows(&[&["1", "22", "x"], &["333", "4, 5"], &["é", "", "y"]]),
            &comments,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "1  , 22    , x\n# note\n333, \"4, 5\"\né  ,       , y\n"
        );
    }

    #[test]
    fn updates_files_in_place() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.csv");
        fs::write(&path, "#csvss: let C1 = A1 + B1;\n1,2\n").unwrap();

        run(&args(&["-u", path.to_str().unwrap()])).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "#csvss: let C1 = A1 + B1;\n1,2,3\n"
        );
    }

    #[test]
    fn writes_aligned_output_files() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        fs::write(&input, "10,2\n3,40\n").unwrap();

        run(&args(&[
            "-i",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "-e",
            "let C2 = SUM(A1:B2);",
            "-a",
        ]))
        .unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), "10, 2 , \n3 , 40, 55\n");
    }

    #[test]
    fn failures_carry_their_cause() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("in.csv");
        fs::write(&input, "1\n").unwrap();

        let err = run(&args(&["-i", input.to_str().unwrap(), "-e", "let A1 = 1 / 0;"]))
            .unwrap_err();
        assert!(
            format!("{err:#}").starts_with("evaluation error: division by zero at "),
            "{err:#}"
        );

        let missing = dir.path().join("missing.csv");
        let err = run(&args(&["-i", missing.to_str().unwrap(), "-e", "let A1 = 1;"]))
            .unwrap_err();
        assert!(format!("{err:#}").starts_with("failed to read "), "{err:#}");
    }
}
