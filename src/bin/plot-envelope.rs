use clap::Parser;
use miditone::generator::envelope::AdsrPhase;
use miditone::generator::InstrumentKind;
use plotters::prelude::*;

const SAMPLE_RATE: f32 = 10000.0; // 0.1ms per sample
const DISCONTINUITY_THRESHOLD: f32 = 0.15;
const MAX_SECONDS: f32 = 60.0;

/// Plot the amplitude envelope of an instrument to an SVG chart
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Instrument profile (organ, harp, piano, xylophone, glockenspiel)
    instrument: InstrumentKind,

    /// Note-off time in milliseconds
    note_off_ms: f32,

    /// Output SVG path
    output_path: String,
}

struct Envelope {
    samples: Vec<f32>,
    phases: Vec<AdsrPhase>,
    /// Time the release actually starts, in ms
    release_ms: f32,
}

fn generate_envelope(args: &Args) -> Result<Envelope, Box<dyn std::error::Error>> {
    let shape = args.instrument.profile().envelope;
    let note_off = args.note_off_ms / 1000.0;

    let mut samples = Vec::new();
    let mut phases = Vec::new();
    let mut index = 0u32;
    loop {
        let t = index as f32 / SAMPLE_RATE;
        let Some(level) = shape.level(t, Some(note_off)) else {
            break;
        };
        samples.push(level);
        phases.push(shape.phase(t, Some(note_off)));
        index += 1;

        // Safety: prevent infinite loops
        if t > MAX_SECONDS {
            return Err("Envelope exceeded maximum duration".into());
        }
    }

    Ok(Envelope {
        samples,
        phases,
        release_ms: shape.release_start(note_off) * 1000.0,
    })
}

fn check_discontinuities(samples: &[f32]) -> Result<(), Box<dyn std::error::Error>> {
    let mut max_diff: f32 = 0.0;
    let mut max_diff_idx: usize = 0;

    for i in 1..samples.len() {
        let diff = (samples[i] - samples[i - 1]).abs();
        if diff > max_diff {
            max_diff = diff;
            max_diff_idx = i;
        }
    }
    if max_diff > DISCONTINUITY_THRESHOLD {
        return Err(format!(
            "DISCONTINUITY at {:.1}ms: {} -> {} (diff = {})",
            max_diff_idx as f32 / SAMPLE_RATE * 1000.0,
            samples[max_diff_idx - 1],
            samples[max_diff_idx],
            max_diff
        )
        .into());
    }

    println!(
        "  ✓ Max discontinuity: {:.6} at {:.1}ms (below threshold {})",
        max_diff,
        max_diff_idx as f32 / SAMPLE_RATE * 1000.0,
        DISCONTINUITY_THRESHOLD
    );
    Ok(())
}

fn create_plot(args: &Args, envelope: &Envelope) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::new(&args.output_path, (800, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let to_ms = |i: usize| i as f32 / SAMPLE_RATE * 1000.0;
    let max_time = to_ms(envelope.samples.len().max(1));

    let shape = args.instrument.profile().envelope;
    let title = format!(
        "{}: A={}ms, D={}ms, S={:.2}, R={}ms, note_off={}ms",
        args.instrument,
        shape.attack * 1000.0,
        shape.decay * 1000.0,
        shape.sustain,
        shape.release * 1000.0,
        args.note_off_ms
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(&title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f32..max_time, 0f32..1.1f32)?;

    chart
        .configure_mesh()
        .x_desc("Time (ms)")
        .y_desc("Amplitude")
        .x_labels(10)
        .y_labels(10)
        .draw()?;

    chart.draw_series(LineSeries::new(
        envelope
            .samples
            .iter()
            .enumerate()
            .map(|(i, &s)| (to_ms(i), s)),
        BLUE.stroke_width(2),
    ))?;

    // Phase transitions
    for i in 1..envelope.phases.len() {
        if envelope.phases[i] != envelope.phases[i - 1] {
            chart.draw_series(std::iter::once(Cross::new(
                (to_ms(i), envelope.samples[i]),
                8,
                BLACK.filled(),
            )))?;
        }
    }

    // Release start
    let release_index = (envelope.release_ms / 1000.0 * SAMPLE_RATE) as usize;
    if let Some(&level) = envelope.samples.get(release_index) {
        chart.draw_series(std::iter::once(Circle::new(
            (envelope.release_ms, level),
            5,
            RED.filled(),
        )))?;
    }

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if args.note_off_ms < 0.0 {
        return Err("Note off time must be non-negative".into());
    }

    let shape = args.instrument.profile().envelope;
    println!("Envelope Plot Generator");
    println!("=======================");
    println!("  Instrument: {}", args.instrument);
    println!("  Attack: {}ms (curve {})", shape.attack * 1000.0, shape.attack_curve);
    println!("  Decay: {}ms (curve {})", shape.decay * 1000.0, shape.decay_curve);
    println!("  Sustain: {:.2}", shape.sustain);
    println!("  Release: {}ms (curve {})", shape.release * 1000.0, shape.release_curve);
    println!("  Note Off: {}ms", args.note_off_ms);
    println!();

    print!("  Generating envelope... ");
    let envelope = generate_envelope(&args)?;
    println!(
        "done ({} samples, {:.1}ms, release at {:.1}ms)",
        envelope.samples.len(),
        envelope.samples.len() as f32 / SAMPLE_RATE * 1000.0,
        envelope.release_ms
    );

    check_discontinuities(&envelope.samples)?;

    print!("  Creating plot... ");
    create_plot(&args, &envelope)?;
    println!("done");

    println!();
    println!("Output: {}", args.output_path);

    Ok(())
}
