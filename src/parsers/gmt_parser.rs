use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use crate::analysis::gene_sets::GeneSet;
use crate::utils::error::{CoexError, Result};

pub const GMT_DESCRIPTION: &str = "na";

pub fn write_gmt<W: Write>(gene_sets: &[GeneSet], writer: W) -> std::io::Result<()> {
    let mut writer = BufWriter::new(writer);
    for gene_set in gene_sets {
        write!(writer, "{}\t{}", gene_set.name, GMT_DESCRIPTION)?;
        for member in &gene_set.members {
            write!(writer, "\t{}", member)?;
        }
        writeln!(writer)?;
    }
    writer.flush()
}

pub fn write_gmt_file(gene_sets: &[GeneSet], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| CoexError::io(path, e))?;
    write_gmt(gene_sets, file).map_err(|e| CoexError::io(path, e))
}

pub fn read_gmt<R: Read>(reader: R, source_name: &str) -> Result<Vec<GeneSet>> {
    let reader = BufReader::new(reader);
    let mut gene_sets = Vec::new();

    for (line_number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| CoexError::io(source_name, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            return Err(CoexError::schema(
                source_name,
                format!("line {}: expected name and description fields", line_number + 1),
            ));
        }
        gene_sets.push(GeneSet::new(
            fields[0].trim().to_string(),
            fields[2..].iter().map(|member| member.to_string()),
        ));
    }

    Ok(gene_sets)
}

pub fn read_gmt_file(path: impl AsRef<Path>) -> Result<Vec<GeneSet>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| CoexError::io(path, e))?;
    read_gmt(file, &path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_classic_layout() {
        let sets = vec![GeneSet::new(
            "healthy-1".to_string(),
            ["TP53", "EGFR"].iter().map(|s| s.to_string()),
        )];
        let mut buffer = Vec::new();
        write_gmt(&sets, &mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), "healthy-1\tna\tEGFR\tTP53\n");
    }

    #[test]
    fn reads_sets_and_drops_empty_members() {
        let input = "disease-1\tna\tA\t\tB\tA\n\ndisease-2\tdescription\n";
        let sets = read_gmt(input.as_bytes(), "sets.gmt").unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].members, vec!["A", "B"]);
        assert!(sets[1].members.is_empty());
    }

    #[test]
    fn line_without_description_is_rejected() {
        let err = read_gmt("lonely\n".as_bytes(), "bad.gmt").unwrap_err();
        assert!(matches!(err, CoexError::Schema { .. }));
    }
}
