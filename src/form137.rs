//! Form 137 (permanent academic record) rendered as an A4 PDF.
//!
//! The document is assembled entirely in memory from an [`AcademicRecord`]
//! and returned as bytes.

use common::{AcademicRecord, SemesterGradeBlock, SubjectGradeRow};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};
use thiserror::Error;

pub const FIRST_SEMESTER: &str = "1st Semester";
pub const SECOND_SEMESTER: &str = "2nd Semester";

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 15.0;
const LINE_HEIGHT: f32 = 6.0;

// Column offsets of the grade table, in mm from the left margin.
const COL_CODE: f32 = 0.0;
const COL_SUBJECT: f32 = 25.0;
const COL_MIDTERM: f32 = 110.0;
const COL_FINALS: f32 = 130.0;
const COL_RATING: f32 = 150.0;
const COL_ACTION: f32 = 170.0;

#[derive(Error, Debug)]
pub enum Form137Error {
    #[error("PDF rendering failed: {0}")]
    Pdf(#[from] printpdf::Error),
}

/// Grade blocks split into the two regular semesters and everything else.
#[derive(Debug, Default)]
pub struct Terms<'a> {
    pub first: Option<&'a SemesterGradeBlock>,
    pub second: Option<&'a SemesterGradeBlock>,
    pub others: Vec<&'a SemesterGradeBlock>,
}

pub fn partition_terms(record: &AcademicRecord) -> Terms<'_> {
    let mut terms = Terms::default();
    for block in &record.grades {
        match block.semester_name.as_str() {
            FIRST_SEMESTER if terms.first.is_none() => terms.first = Some(block),
            SECOND_SEMESTER if terms.second.is_none() => terms.second = Some(block),
            _ => terms.others.push(block),
        }
    }
    terms
}

fn rows_of(block: Option<&SemesterGradeBlock>) -> &[SubjectGradeRow] {
    block.map(|b| b.subjects.as_slice()).unwrap_or(&[])
}

fn score(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, Form137Error> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
            pages: 1,
        })
    }

    fn ensure_room(&mut self, lines: f32) {
        if self.y - lines * LINE_HEIGHT >= MARGIN {
            return;
        }
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Layer {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn text_at(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer
            .use_text(text, size, Mm(MARGIN + x), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_room(1.0);
        self.text_at(text, size, 0.0, bold);
        self.y -= LINE_HEIGHT;
    }

    fn field(&mut self, label: &str, value: &str) {
        self.ensure_room(1.0);
        self.text_at(label, 10.0, 0.0, true);
        self.text_at(value, 10.0, 45.0, false);
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self) {
        self.y -= LINE_HEIGHT / 2.0;
    }

    fn grade_row(&mut self, cells: [&str; 6], bold: bool) {
        self.ensure_room(1.0);
        let columns = [COL_CODE, COL_SUBJECT, COL_MIDTERM, COL_FINALS, COL_RATING, COL_ACTION];
        for (cell, x) in cells.iter().zip(columns) {
            self.text_at(cell, 9.0, x, bold);
        }
        self.y -= LINE_HEIGHT;
    }

    fn term_table(&mut self, title: &str, rows: &[SubjectGradeRow]) {
        // Heading, column header and at least one row stay together.
        self.ensure_room(3.0);
        self.line(title, 12.0, true);
        self.grade_row(
            ["Code", "Subject", "Midterm", "Finals", "Rating", "Action"],
            true,
        );
        if rows.is_empty() {
            self.line("No grades recorded", 9.0, false);
        }
        for row in rows {
            let (midterm, finals, rating) =
                (score(row.midterm), score(row.finals), score(row.final_rating));
            self.grade_row(
                [
                    row.code.as_str(),
                    row.name.as_str(),
                    midterm.as_str(),
                    finals.as_str(),
                    rating.as_str(),
                    row.action.as_deref().unwrap_or(""),
                ],
                false,
            );
        }
        self.gap();
    }

    fn finish(self) -> Result<Vec<u8>, Form137Error> {
        Ok(self.doc.save_to_bytes()?)
    }
}

/// Render the Form 137 of one student.
pub fn render_form137(record: &AcademicRecord) -> Result<Vec<u8>, Form137Error> {
    let demographics = &record.demographics;
    let mut writer = PageWriter::new(&format!("Form 137 - {}", demographics.full_name))?;

    writer.line("Learner's Permanent Academic Record", 16.0, true);
    writer.line("(Form 137)", 10.0, false);
    writer.gap();

    writer.line("Learner Information", 12.0, true);
    let birth_date = demographics
        .birth_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| common::NOT_AVAILABLE.to_string());
    let fields = [
        ("LRN", demographics.lrn.as_str()),
        ("Last Name", demographics.last_name.as_str()),
        ("First Name", demographics.first_name.as_str()),
        ("Middle Name", demographics.middle_name.as_str()),
        ("Sex", demographics.sex.as_str()),
        ("Birth Date", birth_date.as_str()),
        ("Address", demographics.address.as_str()),
        ("Contact Number", demographics.contact_number.as_str()),
        ("Strand", demographics.strand.as_str()),
        ("Year Level", demographics.year_level.as_str()),
        ("Section", demographics.section.as_str()),
    ];
    for (label, value) in fields {
        writer.field(label, value);
    }
    writer.gap();

    writer.line("Birthplace", 12.0, true);
    writer.field("Province", &record.birthplace.province);
    writer.field("Municipality", &record.birthplace.municipality);
    writer.field("Barangay", &record.birthplace.barangay);
    writer.gap();

    writer.line("Parent / Guardian", 12.0, true);
    writer.field("Name", &record.guardian.name);
    writer.field("Relationship", &record.guardian.relationship);
    writer.field("Contact", &record.guardian.contact);
    writer.gap();

    let terms = partition_terms(record);
    writer.term_table(FIRST_SEMESTER, rows_of(terms.first));
    writer.term_table(SECOND_SEMESTER, rows_of(terms.second));
    for block in terms.others {
        writer.term_table(&block.semester_name, &block.subjects);
    }

    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{Birthplace, Demographics, GuardianInfo};

    fn block(name: &str, subjects: usize) -> SemesterGradeBlock {
        SemesterGradeBlock {
            semester_name: name.to_string(),
            subjects: (0..subjects)
                .map(|i| SubjectGradeRow {
                    subject_id: i as i32 + 1,
                    name: format!("Subject {}", i + 1),
                    code: format!("SUB{:03}", i + 1),
                    midterm: Some(80.0),
                    finals: Some(92.0),
                    final_rating: Some(86.0),
                    action: Some("PASSED".to_string()),
                })
                .collect(),
        }
    }

    fn record_with(grades: Vec<SemesterGradeBlock>) -> AcademicRecord {
        AcademicRecord {
            student_id: 1,
            demographics: Demographics {
                lrn: "123456789012".to_string(),
                first_name: "Ana".to_string(),
                middle_name: "N/A".to_string(),
                last_name: "Reyes".to_string(),
                full_name: "Ana Reyes".to_string(),
                sex: "F".to_string(),
                birth_date: chrono::NaiveDate::from_ymd_opt(2008, 3, 14),
                address: "Quezon City".to_string(),
                contact_number: "N/A".to_string(),
                section: "Einstein".to_string(),
                strand: "STEM".to_string(),
                year_level: "Grade 11".to_string(),
            },
            guardian: GuardianInfo {
                name: "Maria Reyes".to_string(),
                relationship: "Mother".to_string(),
                contact: "N/A".to_string(),
            },
            birthplace: Birthplace {
                province: "Metro Manila".to_string(),
                municipality: "Quezon City".to_string(),
                barangay: "N/A".to_string(),
            },
            grades,
        }
    }

    #[test]
    fn test_partition_terms_splits_regular_semesters_from_others() {
        let record = record_with(vec![
            block("Summer", 1),
            block(SECOND_SEMESTER, 2),
            block(FIRST_SEMESTER, 3),
        ]);

        let terms = partition_terms(&record);

        assert_eq!(terms.first.map(|b| b.subjects.len()), Some(3));
        assert_eq!(terms.second.map(|b| b.subjects.len()), Some(2));
        assert_eq!(terms.others.len(), 1);
        assert_eq!(terms.others[0].semester_name, "Summer");
    }

    #[test]
    fn test_partition_terms_without_grades() {
        let record = record_with(vec![]);
        let terms = partition_terms(&record);
        assert!(terms.first.is_none());
        assert!(terms.second.is_none());
        assert!(terms.others.is_empty());
    }

    #[test]
    fn test_render_produces_pdf_bytes() {
        let record = record_with(vec![block(FIRST_SEMESTER, 2)]);
        let bytes = render_form137(&record).expect("render");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_spills_long_records_onto_more_pages() {
        let short = render_form137(&record_with(vec![block(FIRST_SEMESTER, 1)])).expect("render");
        let long = render_form137(&record_with(vec![
            block(FIRST_SEMESTER, 40),
            block(SECOND_SEMESTER, 40),
        ]))
        .expect("render");
        assert_eq!(page_count(&short), 1);
        assert!(page_count(&long) >= 2);
    }

    /// Number of `/Type /Page` dictionaries, ignoring the `/Pages` tree node.
    fn page_count(pdf: &[u8]) -> usize {
        let text = String::from_utf8_lossy(pdf);
        text.match_indices("/Type")
            .filter(|(at, _)| {
                let rest = text[at + "/Type".len()..].trim_start();
                rest.starts_with("/Page") && !rest.starts_with("/Pages")
            })
            .count()
    }
}
