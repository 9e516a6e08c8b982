// Round trips through the partition and GMT interchange files.

#[cfg(test)]
mod interchange_tests {
    use std::fs;
    use coexnet::analysis::community_detection::Partition;
    use coexnet::analysis::gene_sets::gene_sets_from_partition;
    use coexnet::analysis::pipeline::{build_network, project_partition};
    use coexnet::analysis::write_results::{write_enrichment_results, write_network_results};
    use coexnet::parsers::expression_parser::ExpressionTable;
    use coexnet::utils::params::{EnrichmentParams, NetworkParams};
    use coexnet::parsers::gmt_parser::{read_gmt_file, write_gmt_file};
    use coexnet::parsers::partition_parser::{read_partition, write_partition_file};
    use coexnet::CoexError;
    use tempfile::tempdir;

    fn partition() -> Partition {
        let mut partition = Partition::default();
        for (gene, community) in [
            ("TP53", 0), ("MDM2", 0), ("CDKN1A", 0),
            ("EGFR", 1), ("ERBB2", 1),
            ("MYC", 2), ("MAX", 2), ("MXD1", 2), ("MNT", 2),
        ] {
            partition.insert(gene.to_string(), community);
        }
        partition
    }

    #[test]
    fn partition_file_reproduces_gene_sets() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partition.csv");
        write_partition_file(&partition(), &path).unwrap();

        let reread = read_partition(&path).unwrap();
        assert_eq!(reread, partition());
        assert_eq!(
            gene_sets_from_partition(&reread, "healthy"),
            gene_sets_from_partition(&partition(), "healthy")
        );
        assert_eq!(gene_sets_from_partition(&reread, "healthy")[2].name, "healthy-3");
    }

    #[test]
    fn tab_separated_partition_with_other_headers() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("modules.tsv");
        fs::write(&path, "Symbol\tCluster\ntp53\t0\nmdm2\t0\negfr\t1\n").unwrap();
        let partition = read_partition(&path).unwrap();
        assert_eq!(partition.n_communities(), 2);
        assert_eq!(partition.get("MDM2"), Some(0));
    }

    #[test]
    fn partition_without_community_column_is_fatal() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        fs::write(&path, "gene,weight\nTP53,0.9\n").unwrap();
        assert!(matches!(read_partition(&path), Err(CoexError::Schema { .. })));
    }

    #[test]
    fn gmt_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("healthy_gene_sets.gmt");
        let sets = gene_sets_from_partition(&partition(), "healthy");
        write_gmt_file(&sets, &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("healthy-1\tna\tCDKN1A\tMDM2\tTP53\n"));
        assert_eq!(read_gmt_file(&path).unwrap(), sets);
    }

    #[test]
    fn missing_partition_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = read_partition(dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, CoexError::Io { .. }));
    }

    #[test]
    fn written_results_feed_the_enrichment_run() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("healthy.csv");
        fs::write(
            &source,
            "gene,S1,S2,S3,S4,S5\n\
             A1,1,2,3,4,5\n\
             A2,2,4,6,8,10\n\
             A3,1.5,2.5,3.5,4.5,5.5\n\
             B1,5,1,4,2,3\n\
             B2,10,2,8,4,6\n\
             B3,6,2,5,3,4\n",
        )
        .unwrap();
        let (table, _) = ExpressionTable::from_csv_file(&source).unwrap();
        let params = NetworkParams { min_community_size: 0, ..Default::default() };
        let network = build_network(&table, &params, "healthy").unwrap();

        let network_dir = dir.path().join("network");
        write_network_results(&network, "healthy", &network_dir).unwrap();
        for name in ["partition.csv", "network_edges.csv", "centrality.csv", "healthy_gene_sets.gmt"] {
            assert!(network_dir.join(name).exists(), "{} missing", name);
        }
        let partition_text = fs::read_to_string(network_dir.join("partition.csv")).unwrap();
        assert!(partition_text.starts_with("gene,community\nA1,0\n"));

        let partition = read_partition(network_dir.join("partition.csv")).unwrap();
        let enrichment = project_partition(
            &partition,
            "healthy",
            &table,
            &EnrichmentParams::default(),
            Some("disease"),
        )
        .unwrap();
        let enrichment_dir = dir.path().join("enrichment");
        write_enrichment_results(&enrichment, "healthy", &enrichment_dir).unwrap();

        let scores = fs::read_to_string(enrichment_dir.join("enrichment_scores.csv")).unwrap();
        assert!(scores.starts_with("sample,gene_set,es,nes\n"));
        assert_eq!(scores.lines().count(), 1 + 5 * 2);
        let summary = fs::read_to_string(enrichment_dir.join("enrichment_summary.csv")).unwrap();
        assert_eq!(summary.lines().count(), 3);
    }

    #[test]
    fn empty_network_survives_write_read_and_scoring() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("sparse.csv");
        fs::write(&source, "gene,S1,S2,S3,S4,S5\nG1,1,2,3,4,5\nG2,5,1,4,2,3\nG3,2,5,1,4,3\n").unwrap();
        let (table, _) = ExpressionTable::from_csv_file(&source).unwrap();
        let network = build_network(&table, &NetworkParams::default(), "sparse").unwrap();
        assert!(network.communities.partition.is_empty());
        assert_eq!(network.network.edge_count(), 0);

        let network_dir = dir.path().join("network");
        write_network_results(&network, "sparse", &network_dir).unwrap();
        assert_eq!(
            fs::read_to_string(network_dir.join("partition.csv")).unwrap(),
            "gene,community\n"
        );
        assert_eq!(
            fs::read_to_string(network_dir.join("centrality.csv")).unwrap(),
            "community,rank,gene,pagerank\n"
        );
        assert_eq!(
            fs::read_to_string(network_dir.join("network_edges.csv")).unwrap(),
            "source,target,weight\n"
        );

        let partition = read_partition(network_dir.join("partition.csv")).unwrap();
        assert!(partition.is_empty());
        let enrichment = project_partition(
            &partition,
            "sparse",
            &table,
            &EnrichmentParams::default(),
            None,
        )
        .unwrap();
        assert!(enrichment.summaries.is_empty());
        assert!(enrichment.diagnostics.excluded_sets.is_empty());

        let enrichment_dir = dir.path().join("enrichment");
        write_enrichment_results(&enrichment, "sparse", &enrichment_dir).unwrap();
        assert_eq!(
            fs::read_to_string(enrichment_dir.join("enrichment_scores.csv")).unwrap(),
            "sample,gene_set,es,nes\n"
        );
        assert_eq!(
            fs::read_to_string(enrichment_dir.join("enrichment_summary.csv")).unwrap(),
            "gene_set,n_members,n_present,n_samples,mean_es,std_es,mean_nes,std_nes,interpretation\n"
        );
    }
}
