use anyhow::Context;
use clap::Parser;

/// Convert an ODIM_H5 polar volume or scan and print a summary of the radar record.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    filename: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let Args { filename } = Args::parse();
    let volume =
        odim_bridge::open(&filename).with_context(|| format!("Could not open `{filename}`"))?;
    let radar = odim_bridge::convert(&volume)
        .with_context(|| format!("Could not convert `{filename}`"))?;

    for (key, value) in &radar.metadata {
        println!("{key}: {value}");
    }
    println!(
        "location: {:.4} N, {:.4} E, {} m",
        radar.latitude.value(),
        radar.longitude.value(),
        radar.altitude.value()
    );
    println!("scan type: {}", radar.scan_type);
    println!(
        "sweeps: {}, rays: {}, gates: {}",
        radar.nsweeps, radar.nrays, radar.ngates
    );
    if let Some(units) = &radar.time.units {
        println!("time: {units}");
    }
    for (sweep, rays) in radar.iter_slice().enumerate() {
        println!(
            "  sweep {sweep}: rays {}..={}, fixed angle {}",
            rays.start,
            rays.end - 1,
            radar.fixed_angle.data[sweep]
        );
    }
    for (name, field) in &radar.fields {
        let valid = field.mask.iter().filter(|&&masked| !masked).count();
        println!(
            "field {name} [{}]: {valid} of {} gates valid",
            field.units.as_deref().unwrap_or("-"),
            field.mask.len()
        );
    }
    Ok(())
}
