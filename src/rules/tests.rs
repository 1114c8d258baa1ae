use super::*;

fn rule(name: &str, action: RuleAction) -> FieldRule {
    FieldRule { name: name.to_string(), description: String::new(), action }
}

mod loader {
    use super::*;

    #[test]
    fn action_prefixes_select_the_action() {
        let rules = parse_rules(
            "DELETE: _shelx_hkl_file\n\
             EDIT: _diffrn_ambient_temperature 293\n\
             APPEND: _exptl_absorpt_process_details extra note\n\
             RENAME: _refine_diff_density_max _refine_diff.potential_max\n\
             CALCULATE: _exposure_hours = _exposure_minutes / 60\n\
             _cell_length_a 10.0\n",
        );
        let actions: Vec<&str> = rules.iter().map(FieldRule::action_name).collect();
        assert_eq!(actions, vec!["DELETE", "EDIT", "APPEND", "RENAME", "CALCULATE", "CHECK"]);
        assert_eq!(rules[3].action, RuleAction::Rename {
            target: "_refine_diff.potential_max".to_string(),
        });
        assert_eq!(rules[4].action, RuleAction::Calculate {
            expression: "_exposure_minutes / 60".to_string(),
        });
    }

    #[test]
    fn prefix_matching_is_case_insensitive() {
        let rules = parse_rules("delete: _a\nRename: _b _c\n");
        assert_eq!(rules[0].action, RuleAction::Delete);
        assert_eq!(rules[1].action, RuleAction::Rename { target: "_c".to_string() });
    }

    #[test]
    fn repeated_check_lines_aggregate_suggestions() {
        let rules = parse_rules(
            "_diffrn_ambient_temperature 100\n\
             _diffrn_ambient_temperature 150\n\
             _diffrn_ambient_temperature 100\n",
        );
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].action, RuleAction::Check {
            default_value: "100".to_string(),
            suggestions: vec!["100".to_string(), "150".to_string()],
        });
    }

    #[test]
    fn check_default_is_first_non_empty_value() {
        let rules = parse_rules("_audit_creation_method\n_audit_creation_method CIVET\n");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].action, RuleAction::Check {
            default_value: "CIVET".to_string(),
            suggestions: vec!["CIVET".to_string()],
        });
    }

    #[test]
    fn repeated_append_lines_concatenate_with_blank_separator() {
        let rules = parse_rules(
            "APPEND: _exptl_notes first paragraph\nAPPEND: _exptl_notes second paragraph\n",
        );
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].action, RuleAction::Append {
            text: "first paragraph\n\nsecond paragraph".to_string(),
        });
    }

    #[test]
    fn descriptions_attach_from_either_comment_form() {
        let rules = parse_rules(
            "# _cell_length_a: cell edge a in angstroms\n\
             _cell_length_a 10.0\n\
             _cell_length_b 12.0 # cell edge b\n",
        );
        assert_eq!(rules[0].description, "cell edge a in angstroms");
        assert_eq!(rules[1].description, "cell edge b");
    }

    #[test]
    fn options_tail_moves_to_its_own_line() {
        let rules = parse_rules(
            "_exptl_crystal_colour colourless # visual estimate, options: colourless, yellow\n",
        );
        assert_eq!(rules[0].description, "visual estimate,\noptions: colourless, yellow");
    }

    #[test]
    fn malformed_lines_are_skipped_not_fatal() {
        let cases = [
            "DELETE: _a extra_token",
            "DELETE: not_a_field",
            "RENAME: _only_one",
            "RENAME: _a no_sigil",
            "CALCULATE: _a =",
            "CALCULATE: no_sigil = 1 + 1",
            "EDIT: no_sigil 42",
        ];
        for case in cases {
            let text = format!("{case}\n_cell_length_a 10.0\n");
            let rules = parse_rules(&text);
            assert_eq!(rules.len(), 1, "expected only the CHECK rule for {case:?}");
            assert_eq!(rules[0].name, "_cell_length_a");
        }
    }

    #[test]
    fn pure_comment_lines_never_parse_as_rules() {
        let rules = parse_rules("// _ignored 1\n# plain comment\n\n_real_field 2\n");
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].name, "_real_field");
    }
}

mod engine {
    use super::*;

    #[test]
    fn delete_drops_every_matching_line_and_logs_once() {
        let content = "_shelx_hkl_file x\n_cell_length_a 10.0\n  _shelx_hkl_file y\n";
        let (text, log) = apply_rules(content, &[rule("_shelx_hkl_file", RuleAction::Delete)]);
        assert_eq!(text, "_cell_length_a 10.0\n");
        assert_eq!(log, vec!["DELETED: _shelx_hkl_file"]);
    }

    #[test]
    fn edit_rewrites_the_line_with_four_space_separation() {
        let content = "_diffrn_ambient_temperature 999\n";
        let (text, log) = apply_rules(
            content,
            &[rule("_diffrn_ambient_temperature", RuleAction::Edit { value: "293".to_string() })],
        );
        assert_eq!(text, "_diffrn_ambient_temperature    293\n");
        assert_eq!(log, vec!["EDITED: _diffrn_ambient_temperature -> 293"]);
    }

    #[test]
    fn edit_with_empty_value_removes_the_line() {
        let content = "_a 1\n_b 2\n";
        let (text, log) =
            apply_rules(content, &[rule("_a", RuleAction::Edit { value: String::new() })]);
        assert_eq!(text, "_b 2\n");
        assert_eq!(log, vec!["DELETED: _a"]);
    }

    #[test]
    fn rename_preserves_indent_and_remainder() {
        let content = "  _refine_diff_density_max 0.12\n";
        let renames = [rule(
            "_refine_diff_density_max",
            RuleAction::Rename { target: "_refine_diff.potential_max".to_string() },
        )];
        let (text, log) = apply_rules(content, &renames);
        assert_eq!(text, "  _refine_diff.potential_max 0.12\n");
        assert_eq!(log, vec!["RENAMED: _refine_diff_density_max -> _refine_diff.potential_max"]);

        // Fixed point: a second application finds nothing to rename.
        let (again, log) = apply_rules(&text, &renames);
        assert_eq!(again, text);
        assert!(log.is_empty());
    }

    #[test]
    fn rename_requires_a_whole_token_match() {
        let content = "_refine_diff_density_max_esd 0.02\n";
        let (text, log) = apply_rules(
            content,
            &[rule(
                "_refine_diff_density_max",
                RuleAction::Rename { target: "_refine_diff.potential_max".to_string() },
            )],
        );
        assert_eq!(text, content);
        assert!(log.is_empty());
    }

    #[test]
    fn rename_touches_loop_headers() {
        // A loop header line carries the bare field name; the rename applies
        // there exactly as it does on data lines.
        let content = "loop_\n _refine_diff_density_max\n 0.12\n";
        let (text, _) = apply_rules(
            content,
            &[rule(
                "_refine_diff_density_max",
                RuleAction::Rename { target: "_refine_diff.potential_max".to_string() },
            )],
        );
        assert_eq!(text, "loop_\n _refine_diff.potential_max\n 0.12\n");
    }

    #[test]
    fn calculate_edits_the_field_in_place() {
        let content = "_exposure_minutes 120\n_b '2'\n_exposure_hours 0\n";
        let (text, log) = apply_rules(
            content,
            &[rule(
                "_exposure_hours",
                RuleAction::Calculate { expression: "_exposure_minutes / (_b * 60)".to_string() },
            )],
        );
        assert_eq!(text, "_exposure_minutes 120\n_b '2'\n_exposure_hours    1\n");
        assert_eq!(log, vec!["CALCULATED: _exposure_hours = 1"]);
    }

    #[test]
    fn calculate_appends_when_the_field_is_absent() {
        let content = "_exposure_minutes 90\n";
        let (text, log) = apply_rules(
            content,
            &[rule(
                "_exposure_hours",
                RuleAction::Calculate { expression: "_exposure_minutes / 60".to_string() },
            )],
        );
        assert_eq!(text, "_exposure_minutes 90\n_exposure_hours    1.5\n");
        assert_eq!(log, vec!["CALCULATED: _exposure_hours = 1.5"]);
    }

    #[test]
    fn calculate_with_unresolved_field_assigns_nothing() {
        let content = "_a 120\n";
        let (text, log) = apply_rules(
            content,
            &[rule("_ratio", RuleAction::Calculate { expression: "_a / (_b * 60)".to_string() })],
        );
        assert_eq!(text, content);
        assert!(log.is_empty());
    }

    #[test]
    fn calculate_reads_values_with_uncertainty_suffixes() {
        let content = "_cell_length_a 10.00(3)\n";
        let (text, _) = apply_rules(
            content,
            &[rule(
                "_cell_volume",
                RuleAction::Calculate { expression: "_cell_length_a ^ 3".to_string() },
            )],
        );
        assert!(text.ends_with("_cell_volume    1000\n"));
    }

    #[test]
    fn calculate_ignores_values_inside_semicolon_blocks() {
        let content = "_notes\n;\n_hidden 5\n;\n_a 2\n";
        let (text, log) = apply_rules(
            content,
            &[rule("_sum", RuleAction::Calculate { expression: "_hidden + _a".to_string() })],
        );
        assert_eq!(text, content);
        assert!(log.is_empty());
    }

    #[test]
    fn append_inserts_before_the_closing_delimiter() {
        let content = "_exptl_absorpt_process_details\n;\nSADABS was used.\n;\n";
        let (text, log) = apply_appends(
            content,
            &[rule(
                "_exptl_absorpt_process_details",
                RuleAction::Append { text: "Scaling applied afterwards.".to_string() },
            )],
        );
        assert_eq!(
            text,
            "_exptl_absorpt_process_details\n;\nSADABS was used.\n\nScaling applied afterwards.\n;\n"
        );
        assert_eq!(log, vec!["APPENDED: _exptl_absorpt_process_details"]);
    }

    #[test]
    fn append_skips_earlier_non_multiline_occurrences() {
        // A loop header names the field without a semicolon block after it;
        // the append must land in the later multiline occurrence.
        let content = "loop_\n _exptl_notes\n value\n_exptl_notes\n;\nblock text\n;\n";
        let (text, log) = apply_appends(
            content,
            &[rule("_exptl_notes", RuleAction::Append { text: "more".to_string() })],
        );
        assert_eq!(text, "loop_\n _exptl_notes\n value\n_exptl_notes\n;\nblock text\n\nmore\n;\n");
        assert_eq!(log, vec!["APPENDED: _exptl_notes"]);
    }

    #[test]
    fn append_is_a_no_op_for_non_multiline_fields() {
        let content = "_exptl_absorpt_process_details 'single line'\n";
        let (text, log) = apply_appends(
            content,
            &[rule(
                "_exptl_absorpt_process_details",
                RuleAction::Append { text: "extra".to_string() },
            )],
        );
        assert_eq!(text, content);
        assert!(log.is_empty());
    }

    #[test]
    fn check_rules_change_nothing() {
        let content = "_cell_length_a 10.0\n";
        let check = rule(
            "_cell_length_a",
            RuleAction::Check { default_value: "10.0".to_string(), suggestions: vec![] },
        );
        let (text, log) = apply_rules(content, &[check]);
        assert_eq!(text, content);
        assert!(log.is_empty());
    }

    #[test]
    fn missing_trailing_newline_is_preserved() {
        let (text, _) = apply_rules("_a 1", &[rule("_b", RuleAction::Delete)]);
        assert_eq!(text, "_a 1");
    }
}
