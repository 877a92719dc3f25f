#[cfg(test)]
mod pipeline_tests {
    use crate::config::PipelineConfig;
    use crate::data_models::{CounterValue, COL_GRAN_END_TIME_FMT, COL_GRAN_END_TIME_FMT_STR, COL_SERIAL, COL_SOURCE_NAME};
    use crate::export;
    use crate::parallel::{expand_inputs, ParallelProcessor};
    use crate::pipeline::{extract_records, run};
    use crate::tests::test_helpers::test_helpers::*;
    use approx::assert_relative_eq;

    const RAR: &str = "RAR Success Rate (%)";
    const DL_BLER: &str = "DL R-BLER";

    fn rach_block(cell: u32) -> String {
        meas_info(
            "RACH.NumMsg2Att RACH.NumMsg1Rcvd",
            "20240101T000000",
            &[entry(&cell_dn("DU-1", cell), "50 100")],
        )
    }

    fn kpi(report_value: Option<&CounterValue>) -> f64 {
        report_value.and_then(CounterValue::as_f64).expect("KPI value")
    }

    #[test]
    fn test_two_files_same_cell() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_file(dir.path(), "a.xml", &pm_document("DU-1", &[rach_block(1)]));
        let b = write_file(dir.path(), "b.xml", &pm_document("DU-1", &[rach_block(1)]));

        let report = run(&[a, b], &PipelineConfig::default(), &ParallelProcessor::sequential()).unwrap();
        assert_eq!(report.dataset.len(), 2);
        assert_eq!(report.derived_kpis, vec![RAR.to_string()]);
        assert_eq!(report.summary.files_processed, 2);
        assert_eq!(report.summary.distinct_cells, 1);

        for (record, file) in report.dataset.records.iter().zip(["a.xml", "b.xml"]) {
            assert_eq!(record.cell_id, "Cell1");
            assert_eq!(record.source_filename, file);
            assert_eq!(record.render(COL_SOURCE_NAME).as_deref(), Some("DU-1"));
            assert_eq!(record.render(COL_SERIAL).as_deref(), Some("-eab85c0a1b2c3d-"));
            assert_eq!(record.render(COL_GRAN_END_TIME_FMT).as_deref(), Some("2024-01-01 00:00:00"));
            assert_eq!(record.render(COL_GRAN_END_TIME_FMT_STR).as_deref(), Some("2024/01/01 00:00:00"));
            assert_relative_eq!(kpi(record.get(RAR)), 50.0);
            assert_eq!(record.render(RAR).as_deref(), Some("50.0"));
        }
    }

    #[test]
    fn test_disjoint_counter_sets_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let bler = meas_info(
            "TB.ResidualErrNbrDl TB.TotNbrDlInitial",
            "20240101T001500",
            &[entry(&cell_dn("DU-1", 1), "5 100")],
        );
        let a = write_file(dir.path(), "a.xml", &pm_document("DU-1", &[bler]));
        let b = write_file(dir.path(), "b.xml", &pm_document("DU-1", &[rach_block(2)]));

        let report = run(&[a, b], &PipelineConfig::default(), &ParallelProcessor::sequential()).unwrap();
        assert_eq!(report.dataset.counter_columns.len(), 4);
        assert_eq!(report.derived_kpis, vec![DL_BLER.to_string(), RAR.to_string()]);

        let first = &report.dataset.records[0];
        let second = &report.dataset.records[1];
        assert_eq!(first.render("RACH.NumMsg2Att"), None);
        assert_eq!(second.render("TB.TotNbrDlInitial"), None);
        assert_relative_eq!(kpi(first.get(DL_BLER)), 5.0);
        assert_eq!(kpi(first.get(RAR)), 0.0);
        assert_eq!(kpi(second.get(DL_BLER)), 0.0);
        assert_relative_eq!(kpi(second.get(RAR)), 50.0);
    }

    #[test]
    fn test_malformed_file_is_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(dir.path(), "good.xml", &pm_document("DU-1", &[rach_block(1)]));
        let bad = write_file(dir.path(), "bad.xml", "<measDataFile><measInfo></measDataFile>");

        for processor in [ParallelProcessor::sequential(), ParallelProcessor::with_workers(2)] {
            let report = run(&[bad.clone(), good.clone()], &PipelineConfig::default(), &processor).unwrap();
            assert_eq!(report.failures.len(), 1);
            assert_eq!(report.failures[0].file_path, bad);
            assert_eq!(report.summary.files_processed, 1);
            assert_eq!(report.summary.files_failed, 1);
            assert_eq!(report.dataset.len(), 1);
            assert!(!report.all_failed());
        }
    }

    #[test]
    fn test_row_count_matches_entries_with_results() {
        let dir = tempfile::tempdir().unwrap();
        let two = meas_info(
            "A B",
            "20240101T000000",
            &[entry(&cell_dn("DU-1", 1), "1 2"), entry(&cell_dn("DU-1", 2), "3 4")],
        );
        let one_plus_empty = meas_info(
            "A B",
            "20240101T000000",
            &[entry(&cell_dn("DU-2", 1), "5 6"), entry(&cell_dn("DU-2", 2), " ")],
        );
        let nameless = meas_info("", "20240101T000000", &[entry(&cell_dn("DU-3", 1), "7")]);
        let paths = vec![
            write_file(dir.path(), "a.xml", &pm_document("DU-1", &[two])),
            write_file(dir.path(), "b.xml", &pm_document("DU-2", &[one_plus_empty, nameless])),
        ];

        let batch = extract_records(&paths, &PipelineConfig::default(), &ParallelProcessor::sequential());
        assert_eq!(batch.dataset.len(), 3);
        assert_eq!(batch.files_processed, 2);
        assert!(batch.failures.is_empty());
    }

    #[test]
    fn test_trace_counters_and_non_cell_objects_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let block = meas_info(
            "TraceDU.UeCount RACH.NumMsg2Att RACH.NumMsg1Rcvd",
            "20240101T000000",
            &[
                entry(&cell_dn("DU-1", 1), "3 25 100"),
                entry("ME-Id=DU-1,GNBDUFunction=1", "9 1 1"),
            ],
        );
        let path = write_file(dir.path(), "a.xml", &pm_document("DU-1", &[block]));

        let report = run(&[path], &PipelineConfig::default(), &ParallelProcessor::sequential()).unwrap();
        assert_eq!(report.dropped_columns, vec!["TraceDU.UeCount".to_string()]);
        assert!(!report.dataset.has_column("TraceDU.UeCount"));
        assert_eq!(report.dataset.len(), 1);
        assert_eq!(report.dataset.records[0].cell_id, "Cell1");
        assert_relative_eq!(kpi(report.dataset.records[0].get(RAR)), 25.0);
    }

    #[test]
    fn test_allow_list_and_cell_selection() {
        let dir = tempfile::tempdir().unwrap();
        let block = meas_info(
            "RACH.NumMsg2Att RACH.NumMsg1Rcvd",
            "20240101T000000",
            &[
                entry(&cell_dn("DU-1", 1), "1 2"),
                entry(&cell_dn("DU-1", 2), "1 4"),
                entry(&cell_dn("DU-1", 3), "1 8"),
            ],
        );
        let path = write_file(dir.path(), "a.xml", &pm_document("DU-1", &[block]));

        let allow = PipelineConfig {
            allowed_object_dns: vec![cell_dn("DU-1", 1), cell_dn("DU-1", 3)],
            ..Default::default()
        };
        let report = run(&[path.clone()], &allow, &ParallelProcessor::sequential()).unwrap();
        let cells: Vec<&str> = report.dataset.records.iter().map(|r| r.cell_id.as_str()).collect();
        assert_eq!(cells, vec!["Cell1", "Cell3"]);

        let select = PipelineConfig {
            cell_selectors: vec!["CELL2".into()],
            ..Default::default()
        };
        let report = run(&[path], &select, &ParallelProcessor::sequential()).unwrap();
        assert_eq!(report.dataset.len(), 1);
        assert_eq!(report.dataset.records[0].cell_id, "Cell2");
        assert_relative_eq!(kpi(report.dataset.records[0].get(RAR)), 25.0);
    }

    #[test]
    fn test_directory_input_to_csv_exports() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "b.xml", &pm_document("DU-1", &[rach_block(2)]));
        write_file(dir.path(), "a.xml", &pm_document("DU-1", &[rach_block(1)]));
        let out = tempfile::tempdir().unwrap();

        let paths = expand_inputs(&[dir.path().to_path_buf()]);
        let report = run(&paths, &PipelineConfig::default(), &ParallelProcessor::sequential()).unwrap();
        let wide = export::export_to_dir(&report.dataset, out.path()).unwrap();
        let text = std::fs::read_to_string(wide).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(",Cell,RACH.NumMsg2Att,RACH.NumMsg1Rcvd,RAR Success Rate (%)"));
        assert!(lines[1].starts_with("a.xml,"));
        assert!(lines[1].ends_with(",Cell1,50,100,50.0"));

        let selected: Vec<&str> = report.derived_kpis.iter().map(String::as_str).collect();
        let long_path = out.path().join("long.csv");
        export::write_long_csv_to_path(&report.dataset.long_format(&selected), &long_path).unwrap();
        let long = std::fs::read_to_string(long_path).unwrap();
        assert_eq!(long.lines().count(), 3);
        assert!(long.contains("2024/01/01 00:00:00,Cell2,RAR Success Rate (%),50.0"));
    }
}
