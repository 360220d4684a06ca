//! Very simple tool that accepts SVG path as an input, applies path effects and reports its measurements
use pathgeom::*;
use std::{
    env,
    fs::File,
    io::{BufWriter, Read, Write},
};
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

type Error = Box<dyn std::error::Error>;

#[derive(Debug)]
struct Args {
    input_file: String,
    tr: Option<Transform>,
    trim: Option<(Scalar, Scalar)>,
    complement: bool,
    dash: Option<(Scalar, Scalar, Scalar)>,
    force_closed: bool,
    samples: usize,
}

// parse comma separated list of scalars
fn parse_scalars(arg: &str) -> Result<Vec<Scalar>, Error> {
    arg.split(',')
        .map(|value| Ok(value.trim().parse::<Scalar>()?))
        .collect()
}

impl Args {
    fn parse() -> Result<Args, Error> {
        let mut result = Args {
            input_file: String::new(),
            tr: None,
            trim: None,
            complement: false,
            dash: None,
            force_closed: false,
            samples: 0,
        };
        let mut positional = 0;
        let mut args = env::args();
        let cmd = args.next().unwrap_or_else(|| "measure".to_owned());
        while let Some(arg) = args.next() {
            match arg.as_ref() {
                "-h" => {
                    positional = 0;
                    break;
                }
                "-t" => {
                    let values = parse_scalars(&args.next().ok_or("-t requires argument")?)?;
                    let tr = Transform::from_slice(&values)
                        .ok_or("-t requires 6 or 9 matrix values")?;
                    result.tr = Some(tr);
                }
                "-T" => {
                    let values = parse_scalars(&args.next().ok_or("-T requires argument")?)?;
                    match values[..] {
                        [start, stop] => result.trim = Some((start, stop)),
                        _ => return Err("-T requires <start>,<stop>".into()),
                    }
                }
                "-c" => {
                    result.complement = true;
                }
                "-d" => {
                    let values = parse_scalars(&args.next().ok_or("-d requires argument")?)?;
                    match values[..] {
                        [on, off] => result.dash = Some((on, off, 0.0)),
                        [on, off, phase] => result.dash = Some((on, off, phase)),
                        _ => return Err("-d requires <on>,<off>[,<phase>]".into()),
                    }
                }
                "-z" => {
                    result.force_closed = true;
                }
                "-s" => {
                    result.samples = args.next().ok_or("-s requires argument")?.parse()?;
                }
                _ => {
                    positional += 1;
                    match positional {
                        1 => result.input_file = arg,
                        _ => return Err("unexpected positional argment".into()),
                    }
                }
            }
        }
        if positional < 1 {
            eprintln!(
                "Very simple tool that accepts SVG path as an input, applies path effects and reports its measurements"
            );
            eprintln!("\nUSAGE:");
            eprintln!(
                "    {} [-t <matrix>] [-T <start>,<stop>] [-c] [-d <on>,<off>[,<phase>]] [-z] [-s <samples>] <file.path>",
                cmd
            );
            eprintln!("\nARGS:");
            eprintln!("    -t <matrix>        apply transform given as 6 or 9 comma separated values");
            eprintln!("    -T <start>,<stop>  trim path to the range of its length fractions");
            eprintln!("    -c                 keep complement of the trimmed range");
            eprintln!("    -d <on>,<off>      dash path, optionally with phase");
            eprintln!("    -z                 measure open contours as closed");
            eprintln!("    -s <samples>       report position and tangent at evenly spaced points");
            eprintln!("    <file.path>        file containing SVG path ('-' means stdin)");
            std::process::exit(1);
        }
        Ok(result)
    }
}

/// Load path for the file
fn path_load(path: String) -> Result<Path, Error> {
    let mut contents = String::new();
    if path != "-" {
        let mut file = File::open(path)?;
        file.read_to_string(&mut contents)?;
    } else {
        std::io::stdin().read_to_string(&mut contents)?;
    }
    Ok(tracing::debug_span!("[parse]").in_scope(|| contents.parse())?)
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse()?;
    let mut path = path_load(args.input_file)?;
    tracing::debug!("[path:segments_count] {}", path.segments_count());

    if let Some(tr) = args.tr {
        path.transform(tr);
    }
    if let Some((start, stop)) = args.trim {
        tracing::debug_span!("[trim]").in_scope(|| path.trim(start, stop, args.complement));
    }
    if let Some((on, off, phase)) = args.dash {
        tracing::debug_span!("[dash]").in_scope(|| path.dash(on, off, phase));
    }

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    if let Some(bbox) = path.tight_bounds() {
        let [l, t, r, b] = bbox.ltrb();
        writeln!(out, "bounds: {} {} {} {}", l, t, r, b)?;
    }
    let contours: Vec<_> = tracing::debug_span!("[measure]")
        .in_scope(|| ContourMeasureIter::new(&path, args.force_closed, 1.0).collect());
    let mut total = 0.0;
    for (index, contour) in contours.iter().enumerate() {
        total += contour.length();
        writeln!(
            out,
            "contour {}: length={} closed={}",
            index,
            contour.length(),
            contour.is_closed()
        )?;
        if args.samples > 1 {
            for sample in 0..args.samples {
                let distance = contour.length() * sample as Scalar / (args.samples - 1) as Scalar;
                let (pos, tan) = contour.pos_tan(distance);
                writeln!(out, "    {:.3}: pos={:?} tan={:?}", distance, pos, tan)?;
            }
        }
    }
    writeln!(out, "total length: {}", total)?;
    path.write_svg_path(&mut out)?;
    writeln!(out)?;
    Ok(())
}
