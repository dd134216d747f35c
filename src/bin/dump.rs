use anyhow::Context;
use clap::Parser;
use odim_bridge::read::{group::Group, object::Object};
use odim_bridge::FileReader;

/// Print the groups, attributes and dataset shapes of an HDF5 file.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    filename: String,
}

fn print_attributes(group_attributes: impl Iterator<Item = (String, String)>, depth: usize) {
    for (name, value) in group_attributes {
        println!("{:indent$}@{name} = {value}", "", indent = depth * 2);
    }
}

fn dump_group(file: &mut FileReader, group: &Group, depth: usize) -> anyhow::Result<()> {
    print_attributes(
        group
            .attribute_values()
            .into_iter()
            .map(|(name, value)| (name, value.to_string())),
        depth,
    );
    for key in group.keys() {
        let object = group
            .object(file, &key)
            .with_context(|| format!("Could not read `{key}`"))?;
        match object {
            Object::Group(child) => {
                println!("{:indent$}{key}/", "", indent = depth * 2);
                dump_group(file, &child, depth + 1)?;
            }
            Object::Dataset(dataset) => {
                let datatype = dataset.datatype()?;
                println!(
                    "{:indent$}{key} {:?} {:?} {}-bit",
                    "",
                    dataset.shape()?,
                    datatype.encoding,
                    datatype.size * 8,
                    indent = depth * 2
                );
                print_attributes(
                    dataset
                        .attribute_values()
                        .into_iter()
                        .map(|(name, value)| (name, value.to_string())),
                    depth + 1,
                );
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let Args { filename } = Args::parse();
    let mut file = FileReader::open(&filename)
        .with_context(|| format!("Failed to parse `{filename}`"))?;
    let root = file.root();
    println!("/");
    dump_group(&mut file, &root, 1)
}
