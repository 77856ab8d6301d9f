use qiita_db::db::open_db_in_memory;
use qiita_db::{
    LinkStatus, OntologyRepository, PrepTemplateRepository, RawDataRepository,
    SqliteOntologyRepository, SqlitePrepTemplateRepository, SqliteRawDataRepository,
    SqliteStudyRepository, Study, StudyRepository, StudyStatus, UserLevel,
};
use qiita_pet::uimodules::{raw_data_from_other_studies, PanelOptions};
use qiita_pet::{
    ModuleEnv, PrepTemplatePanel, RawDataEditorTab, RawDataTab, RenderError, TemplateRenderer,
    UiContext, UiError,
};
use rusqlite::Connection;
use serde_json::Value;
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

#[derive(Default)]
struct RecordingRenderer {
    calls: RefCell<Vec<(String, Value)>>,
}

impl RecordingRenderer {
    fn last(&self) -> (String, Value) {
        self.calls.borrow().last().cloned().unwrap()
    }
}

impl TemplateRenderer for RecordingRenderer {
    fn render_string(&self, template: &str, context: &Value) -> Result<String, RenderError> {
        self.calls
            .borrow_mut()
            .push((template.to_string(), context.clone()));
        Ok(format!("<rendered {template}>"))
    }
}

struct FailingRenderer;

impl TemplateRenderer for FailingRenderer {
    fn render_string(&self, template: &str, _context: &Value) -> Result<String, RenderError> {
        Err(RenderError::new(template, "template missing"))
    }
}

struct Fixture {
    conn: Connection,
    owner_study: Study,
    other_study: Study,
}

const OWNER: &str = "owner@foo.bar";
const ADMIN: &str = "admin@foo.bar";

fn fixture() -> Fixture {
    let conn = open_db_in_memory().unwrap();
    let (owner_study, other_study) = {
        let studies = SqliteStudyRepository::try_new(&conn).unwrap();
        studies
            .create_user(OWNER, Some("Owner"), UserLevel::User)
            .unwrap();
        studies
            .create_user(ADMIN, Some("Admin"), UserLevel::Admin)
            .unwrap();
        let owner_id = studies
            .create_study(OWNER, "Identification of the Microbiomes", StudyStatus::Private)
            .unwrap();
        let other_id = studies
            .create_study(OWNER, "Soil transect", StudyStatus::Sandbox)
            .unwrap();
        (
            studies.get_study(owner_id).unwrap().unwrap(),
            studies.get_study(other_id).unwrap().unwrap(),
        )
    };
    Fixture {
        conn,
        owner_study,
        other_study,
    }
}

fn request(user: &str) -> UiContext {
    UiContext::new(Some(user.to_string()), "127.0.0.1")
}

#[test]
fn other_studies_map_raw_data_to_last_linked_title() {
    let fx = fixture();
    let studies = SqliteStudyRepository::try_new(&fx.conn).unwrap();
    let raw = SqliteRawDataRepository::try_new(&fx.conn).unwrap();

    let shared_rd = raw.create_raw_data("FASTQ").unwrap();
    raw.link_to_study(shared_rd, fx.other_study.id).unwrap();
    raw.link_to_study(shared_rd, fx.owner_study.id).unwrap();
    let own_rd = raw.create_raw_data("SFF").unwrap();
    raw.link_to_study(own_rd, fx.owner_study.id).unwrap();

    let user = studies.get_user(OWNER).unwrap().unwrap();
    let titles =
        raw_data_from_other_studies(&studies, &raw, &user, fx.owner_study.id).unwrap();

    assert_eq!(titles.len(), 1);
    assert_eq!(
        titles.get(&shared_rd).map(String::as_str),
        Some("Identification of the Microbiomes")
    );
}

#[test]
fn raw_data_tab_renders_sorted_context() {
    let fx = fixture();
    let raw = SqliteRawDataRepository::try_new(&fx.conn).unwrap();
    let first = raw.create_raw_data("FASTQ").unwrap();
    let second = raw.create_raw_data("SFF").unwrap();
    raw.link_to_study(second, fx.owner_study.id).unwrap();
    raw.link_to_study(first, fx.owner_study.id).unwrap();
    let adoptable = raw.create_raw_data("FASTA").unwrap();
    raw.link_to_study(adoptable, fx.other_study.id).unwrap();

    let renderer = RecordingRenderer::default();
    let ctx = request(OWNER);
    let env = ModuleEnv::new(&fx.conn, &renderer, &ctx, &[]);
    let markup = RawDataTab::new(&env).render(&fx.owner_study).unwrap();

    assert_eq!(markup, "<rendered raw_data_tab.html>");
    let (template, context) = renderer.last();
    assert_eq!(template, "raw_data_tab.html");
    assert_eq!(
        context["filetypes"],
        serde_json::json!([["SFF", 1], ["FASTQ", 2], ["FASTA", 3], ["per_sample_FASTQ", 4]])
    );
    assert_eq!(
        context["available_raw_data"],
        serde_json::json!([[first, "FASTQ"], [second, "SFF"]])
    );
    assert_eq!(
        context["other_studies_rd"],
        serde_json::json!([[adoptable, "Soil transect"]])
    );
    assert_eq!(context["study"]["title"], "Identification of the Microbiomes");
    assert_eq!(context["study"]["status"], "private");
}

#[test]
fn modules_require_a_logged_in_user() {
    let fx = fixture();
    let renderer = RecordingRenderer::default();
    let ctx = UiContext::new(None, "10.0.0.1");
    let env = ModuleEnv::new(&fx.conn, &renderer, &ctx, &[]);

    let err = RawDataTab::new(&env).render(&fx.owner_study).unwrap_err();
    assert!(matches!(err, UiError::NotAuthenticated));
    assert!(renderer.calls.borrow().is_empty());
}

#[test]
fn renderer_failure_is_reported() {
    let fx = fixture();
    let ctx = request(OWNER);
    let env = ModuleEnv::new(&fx.conn, &FailingRenderer, &ctx, &[]);

    let err = RawDataTab::new(&env).render(&fx.owner_study).unwrap_err();
    match err {
        UiError::Render(render) => assert_eq!(render.template, "raw_data_tab.html"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn raw_data_editor_builds_form_context() {
    let fx = fixture();
    let raw = SqliteRawDataRepository::try_new(&fx.conn).unwrap();
    let preps = SqlitePrepTemplateRepository::try_new(&fx.conn).unwrap();
    let ontologies = SqliteOntologyRepository::try_new(&fx.conn).unwrap();

    let rd = raw.create_raw_data("FASTQ").unwrap();
    raw.link_to_study(rd, fx.other_study.id).unwrap();
    raw.add_filepath(rd, "1_s_G1_L001_sequences.fastq.gz", "raw_forward_seqs")
        .unwrap();
    let prep_b = preps.create_prep_template(rd, "18S", None).unwrap();
    let prep_a = preps
        .create_prep_template(rd, "16S", Some("Metagenomics"))
        .unwrap();
    ontologies.add_term(1, "Soil survey", true).unwrap();

    let uploads = tempfile::tempdir().unwrap();
    let study_dir = uploads.path().join(fx.other_study.id.to_string());
    fs::create_dir_all(&study_dir).unwrap();
    fs::write(study_dir.join("uploaded_file.txt"), "x").unwrap();
    fs::write(study_dir.join(".DS_Store"), "x").unwrap();
    let roots = vec![PathBuf::from(uploads.path())];

    let renderer = RecordingRenderer::default();
    let ctx = request(OWNER);
    let env = ModuleEnv::new(&fx.conn, &renderer, &ctx, &roots);
    let record = raw.get_raw_data(rd).unwrap().unwrap();
    let view = RawDataEditorTab::new(&env)
        .view(&fx.other_study, &record)
        .unwrap();

    assert_eq!(view.files, vec!["uploaded_file.txt"]);
    assert_eq!(view.data_types[0], ("16S".to_string(), 1));
    assert_eq!(view.data_types.len(), 6);
    assert_eq!(
        view.ena_terms.last().map(String::as_str),
        Some("<option value=\"Other\">Other</option>")
    );
    assert_eq!(view.ena_terms[0], "<option value=\"AMPLICON\">AMPLICON</option>");
    assert_eq!(view.user_defined_terms, vec!["Soil survey", "New Type"]);
    let prep_ids = view
        .available_prep_templates
        .iter()
        .map(|prep| prep.id)
        .collect::<Vec<_>>();
    assert_eq!(prep_ids, vec![prep_b, prep_a]);
    assert_eq!(
        view.filepath_types,
        vec!["forward seqs", "reverse seqs", "barcodes", "sff"]
    );
    assert!(view.is_editable);
    assert!(view.link.show_unlink_btn);
    assert!(!view.link.disable_link_btn);
    assert_eq!(view.raw_data_filetype, "FASTQ");
    assert_eq!(view.raw_data_files.len(), 1);

    RawDataEditorTab::new(&env)
        .render(&fx.other_study, &record)
        .unwrap();
    let (template, context) = renderer.last();
    assert_eq!(template, "raw_data_editor_tab.html");
    assert_eq!(context["show_unlink_btn"], true);
    assert_eq!(context["link_msg"], "");
    assert_eq!(context["study_status"], "sandbox");
    assert_eq!(context["user_level"], "user");
}

#[test]
fn private_study_is_editable_only_by_admins() {
    let fx = fixture();
    let raw = SqliteRawDataRepository::try_new(&fx.conn).unwrap();
    let rd = raw.create_raw_data("FASTQ").unwrap();
    raw.link_to_study(rd, fx.owner_study.id).unwrap();
    raw.add_filepath(rd, "seqs.fastq", "raw_forward_seqs").unwrap();
    raw.set_link_status(rd, &LinkStatus::Failed("disk full".to_string()))
        .unwrap();
    let record = raw.get_raw_data(rd).unwrap().unwrap();
    let renderer = RecordingRenderer::default();

    let owner_ctx = request(OWNER);
    let owner_env = ModuleEnv::new(&fx.conn, &renderer, &owner_ctx, &[]);
    let owner_view = RawDataEditorTab::new(&owner_env)
        .view(&fx.owner_study, &record)
        .unwrap();
    assert!(!owner_view.is_editable);
    assert!(!owner_view.link.show_unlink_btn);
    assert_eq!(
        owner_view.link.link_msg,
        "Error (un)linking files: failed: disk full"
    );

    let admin_ctx = request(ADMIN);
    let admin_env = ModuleEnv::new(&fx.conn, &renderer, &admin_ctx, &[]);
    let admin_view = RawDataEditorTab::new(&admin_env)
        .view(&fx.owner_study, &record)
        .unwrap();
    assert!(admin_view.is_editable);
    assert!(admin_view.link.show_unlink_btn);
}

#[test]
fn linking_raw_data_locks_editor_buttons() {
    let fx = fixture();
    let raw = SqliteRawDataRepository::try_new(&fx.conn).unwrap();
    let rd = raw.create_raw_data("FASTQ").unwrap();
    raw.add_filepath(rd, "seqs.fastq", "raw_forward_seqs").unwrap();
    raw.set_link_status(rd, &LinkStatus::Linking).unwrap();
    let record = raw.get_raw_data(rd).unwrap().unwrap();

    let renderer = RecordingRenderer::default();
    let ctx = request(ADMIN);
    let env = ModuleEnv::new(&fx.conn, &renderer, &ctx, &[]);
    let view = RawDataEditorTab::new(&env)
        .view(&fx.other_study, &record)
        .unwrap();

    assert!(view.link.disable_link_btn);
    assert!(!view.link.show_unlink_btn);
    assert_eq!(view.link.link_msg, "Linking files...");
}

#[test]
fn prep_template_panel_offers_illumina_parameter_sets() {
    let fx = fixture();
    let raw = SqliteRawDataRepository::try_new(&fx.conn).unwrap();
    let preps = SqlitePrepTemplateRepository::try_new(&fx.conn).unwrap();
    let rd = raw.create_raw_data("FASTQ").unwrap();
    let prep_id = preps
        .create_prep_template(rd, "16S", Some("Metagenomics"))
        .unwrap();
    preps
        .add_preprocessed_data(prep_id, qiita_db::ParamTable::PreprocessedIllumina, 1)
        .unwrap();

    let renderer = RecordingRenderer::default();
    let ctx = request(OWNER);
    let env = ModuleEnv::new(&fx.conn, &renderer, &ctx, &[]);
    let ena_terms = vec!["<option value=\"Other\">Other</option>".to_string()];
    let user_defined_terms = vec!["New Type".to_string()];
    let options = PanelOptions {
        study_id: fx.other_study.id,
        study_status: fx.other_study.status,
        is_editable: true,
        ena_terms: &ena_terms,
        user_defined_terms: &user_defined_terms,
    };

    let view = PrepTemplatePanel::new(&env).view(prep_id, &options).unwrap();
    assert_eq!(view.data_type, "16S");
    assert_eq!(view.investigation_type.as_deref(), Some("Metagenomics"));
    assert_eq!(view.preprocessed_data.len(), 1);
    assert_eq!(view.preprocessing_status, "not_preprocessed");
    assert!(view.is_local_request);
    assert!(!view.preprocess_form.rev_comp_mapping_barcodes);
    let set_names = view
        .preprocess_form
        .parameter_sets
        .iter()
        .map(|set| set.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        set_names,
        vec!["Defaults", "Defaults with reverse complement mapping file barcodes"]
    );
    assert!(view.preprocess_form.parameter_sets[1]
        .options
        .contains("--rev_comp_mapping_barcodes"));
    assert_eq!(view.preprocess_form.selected_param_set, Some(1));

    PrepTemplatePanel::new(&env).render(prep_id, &options).unwrap();
    let (template, context) = renderer.last();
    assert_eq!(template, "prep_template_panel.html");
    assert_eq!(context["prep_id"], prep_id);
    assert_eq!(context["is_local_request"], true);

    let err = PrepTemplatePanel::new(&env).view(404, &options).unwrap_err();
    assert!(matches!(err, UiError::Repo(qiita_db::RepoError::NotFound { .. })));
}

#[test]
fn submitted_preprocess_form_resolves_illumina_set() {
    let fx = fixture();
    let raw = SqliteRawDataRepository::try_new(&fx.conn).unwrap();
    let preps = SqlitePrepTemplateRepository::try_new(&fx.conn).unwrap();
    let rd = raw.create_raw_data("FASTQ").unwrap();
    let prep_id = preps.create_prep_template(rd, "16S", None).unwrap();

    let renderer = RecordingRenderer::default();
    let ctx = request(OWNER);
    let env = ModuleEnv::new(&fx.conn, &renderer, &ctx, &[]);
    let panel = PrepTemplatePanel::new(&env);

    let no_fields = Vec::<(&str, &str)>::new();
    assert_eq!(panel.preprocess_param_set(prep_id, no_fields.clone()).unwrap(), 1);
    assert_eq!(
        panel
            .preprocess_param_set(prep_id, [("rev_comp_mapping_barcodes", "y")])
            .unwrap(),
        2
    );
    assert!(matches!(
        panel.preprocess_param_set(404, no_fields),
        Err(UiError::Repo(qiita_db::RepoError::NotFound { .. }))
    ));

    fx.conn
        .execute(
            "DELETE FROM preprocessed_sequence_illumina_params WHERE rev_comp_mapping_barcodes = 1;",
            [],
        )
        .unwrap();
    let err = panel
        .preprocess_param_set(prep_id, [("rev_comp_mapping_barcodes", "on")])
        .unwrap_err();
    assert!(err.to_string().contains("rev_comp_mapping_barcodes=true"));
    assert!(renderer.calls.borrow().is_empty());
}
