use crate::error::{AppError, Result};
use crate::ml::text::word_tokens;
use crate::models::TicketFeatures;
use ndarray::{Array1, Array2, ArrayViewMut1};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Numeric ticket columns, in feature order
pub const NUMERIC_COLUMNS: [&str; 2] = ["spend30d", "eta_to_sla_min"];

/// Categorical ticket columns, in feature order
pub const CATEGORICAL_COLUMNS: [&str; 2] = ["domain", "vip"];

/// TF-IDF vectorizer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfidfConfig {
    /// N-gram range (min, max)
    pub ngram_range: (usize, usize),

    /// Minimum number of documents a term must appear in
    pub min_doc_freq: usize,
}

impl Default for TfidfConfig {
    fn default() -> Self {
        Self {
            ngram_range: (1, 1),
            min_doc_freq: 1,
        }
    }
}

/// Term frequency / inverse document frequency vectorizer.
///
/// Terms are lowercased word tokens of two or more characters, n-grams are
/// joined with a single space. Columns follow the sorted vocabulary, idf is
/// smoothed (`ln((1 + n) / (1 + df)) + 1`) and each row is L2-normalised.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    /// Configuration
    config: TfidfConfig,

    /// Vocabulary mapping (term -> column)
    vocabulary: BTreeMap<String, usize>,

    /// Inverse document frequency, indexed by column
    idf: Vec<f64>,

    /// Is fitted (vocabulary built)
    is_fitted: bool,
}

impl TfidfVectorizer {
    pub fn new(config: TfidfConfig) -> Self {
        Self {
            config,
            vocabulary: BTreeMap::new(),
            idf: Vec::new(),
            is_fitted: false,
        }
    }

    /// Build the vocabulary and idf weights from a corpus
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        let mut term_doc_freq: HashMap<String, usize> = HashMap::new();

        for doc in documents {
            let unique_terms: HashSet<String> = self.extract_terms(doc.as_ref()).into_iter().collect();
            for term in unique_terms {
                *term_doc_freq.entry(term).or_insert(0) += 1;
            }
        }

        // Filter vocabulary by document frequency, then index in term order
        let min_df = self.config.min_doc_freq;
        let kept: BTreeMap<String, usize> = term_doc_freq
            .into_iter()
            .filter(|(_, freq)| *freq >= min_df)
            .collect();

        if kept.is_empty() {
            return Err(AppError::Training(format!(
                "empty vocabulary after pruning terms seen in fewer than {} documents",
                min_df
            )));
        }

        let n_docs = documents.len() as f64;
        self.idf = kept
            .values()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0)
            .collect();
        self.vocabulary = kept
            .into_keys()
            .enumerate()
            .map(|(idx, term)| (term, idx))
            .collect();
        self.is_fitted = true;

        Ok(())
    }

    /// Write the TF-IDF vector of one document into `out`
    fn transform_into(&self, document: &str, mut out: ArrayViewMut1<f64>) {
        for term in self.extract_terms(document) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                out[idx] += 1.0;
            }
        }
        for (value, idf) in out.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        let norm = out.dot(&out).sqrt();
        if norm > 0.0 {
            out /= norm;
        }
    }

    /// Transform one document into a feature vector
    pub fn transform_one(&self, document: &str) -> Result<Array1<f64>> {
        self.ensure_fitted()?;
        let mut row = Array1::zeros(self.n_features());
        self.transform_into(document, row.view_mut());
        Ok(row)
    }

    /// Transform a batch of documents into a (n_docs × n_features) matrix
    pub fn transform<S: AsRef<str>>(&self, documents: &[S]) -> Result<Array2<f64>> {
        self.ensure_fitted()?;
        let mut matrix = Array2::zeros((documents.len(), self.n_features()));
        for (doc, row) in documents.iter().zip(matrix.rows_mut()) {
            self.transform_into(doc.as_ref(), row);
        }
        Ok(matrix)
    }

    /// Fit and transform in one step
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<Array2<f64>> {
        self.fit(documents)?;
        self.transform(documents)
    }

    /// Extract n-gram terms from a document
    fn extract_terms(&self, document: &str) -> Vec<String> {
        let words = word_tokens(document);
        let (min_n, max_n) = self.config.ngram_range;

        let mut terms = Vec::new();
        for n in min_n..=max_n {
            for window in words.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    fn ensure_fitted(&self) -> Result<()> {
        if self.is_fitted {
            Ok(())
        } else {
            Err(AppError::Internal(
                "TfidfVectorizer must be fitted before transform".to_string(),
            ))
        }
    }

    /// Column of a term, if it made it into the vocabulary
    pub fn term_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn idf(&self, term: &str) -> Option<f64> {
        self.term_index(term).map(|idx| self.idf[idx])
    }

    pub fn n_features(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }
}

/// Scales columns to unit variance without centering them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    /// Per-column population standard deviation (1.0 where it is zero)
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(&mut self, data: &Array2<f64>) -> Result<()> {
        let n_rows = data.nrows();
        if n_rows == 0 {
            return Err(AppError::Training(
                "cannot fit a scaler on zero rows".to_string(),
            ));
        }
        self.scale = data
            .columns()
            .into_iter()
            .map(|column| {
                let mean = column.sum() / n_rows as f64;
                let var = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n_rows as f64;
                let std = var.sqrt();
                if std < 10.0 * f64::EPSILON {
                    1.0
                } else {
                    std
                }
            })
            .collect();
        Ok(())
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter().zip(&self.scale).map(|(x, s)| x / s).collect()
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}

/// One-hot encoder whose unknown categories encode as all zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    /// Sorted categories per column
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    /// Learn the category set of each column; `rows` are column-major per record
    pub fn fit<R: AsRef<[String]>>(&mut self, rows: &[R], n_columns: usize) {
        let mut seen: Vec<std::collections::BTreeSet<String>> = vec![Default::default(); n_columns];
        for row in rows {
            for (col, value) in row.as_ref().iter().enumerate().take(n_columns) {
                seen[col].insert(value.clone());
            }
        }
        self.categories = seen.into_iter().map(|set| set.into_iter().collect()).collect();
    }

    /// Encode one record, returning the indicator vector and the indices of
    /// columns whose value was not seen during fit
    pub fn transform_row(&self, row: &[String]) -> (Vec<f64>, Vec<usize>) {
        let mut encoded = vec![0.0; self.n_features()];
        let mut unknown = Vec::new();
        let mut offset = 0;

        for (col, categories) in self.categories.iter().enumerate() {
            match row.get(col).and_then(|v| categories.binary_search(v).ok()) {
                Some(pos) => encoded[offset + pos] = 1.0,
                None => unknown.push(col),
            }
            offset += categories.len();
        }

        (encoded, unknown)
    }

    pub fn categories(&self, column: usize) -> Option<&[String]> {
        self.categories.get(column).map(Vec::as_slice)
    }

    pub fn n_features(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }
}

/// One transformed ticket
#[derive(Debug, Clone)]
pub struct EncodedTicket {
    pub features: Array1<f64>,

    /// Names of categorical columns that fell back to all zeros
    pub unknown_categories: Vec<String>,
}

/// Column transformer for tickets: TF-IDF over `text`, unit-variance scaling
/// over the numeric columns and one-hot over the categorical ones, concatenated
/// in that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketFeatureTransformer {
    tfidf: TfidfVectorizer,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
    is_fitted: bool,
}

impl TicketFeatureTransformer {
    pub fn new(tfidf_config: TfidfConfig) -> Self {
        Self {
            tfidf: TfidfVectorizer::new(tfidf_config),
            scaler: StandardScaler::default(),
            encoder: OneHotEncoder::default(),
            is_fitted: false,
        }
    }

    fn numeric(ticket: &TicketFeatures) -> [f64; 2] {
        [ticket.spend30d, ticket.eta_to_sla_min]
    }

    fn categorical(ticket: &TicketFeatures) -> Vec<String> {
        vec![ticket.domain.clone(), ticket.vip.to_string()]
    }

    pub fn fit(&mut self, tickets: &[TicketFeatures]) -> Result<()> {
        let texts: Vec<&str> = tickets.iter().map(|t| t.text.as_str()).collect();
        self.tfidf.fit(&texts)?;

        let numeric: Vec<f64> = tickets.iter().flat_map(Self::numeric).collect();
        let numeric = Array2::from_shape_vec((tickets.len(), NUMERIC_COLUMNS.len()), numeric)
            .map_err(|e| AppError::Internal(format!("Failed to build numeric matrix: {}", e)))?;
        self.scaler.fit(&numeric)?;

        let categorical: Vec<Vec<String>> = tickets.iter().map(Self::categorical).collect();
        self.encoder.fit(&categorical, CATEGORICAL_COLUMNS.len());

        self.is_fitted = true;
        Ok(())
    }

    /// Transform a single ticket, reporting unseen categories
    pub fn transform_one(&self, ticket: &TicketFeatures) -> Result<EncodedTicket> {
        if !self.is_fitted {
            return Err(AppError::Internal(
                "TicketFeatureTransformer must be fitted before transform".to_string(),
            ));
        }

        let text = self.tfidf.transform_one(&ticket.text)?;
        let numeric = self.scaler.transform_row(&Self::numeric(ticket));
        let (categorical, unknown) = self.encoder.transform_row(&Self::categorical(ticket));

        let mut features = Vec::with_capacity(self.n_features());
        features.extend(text.iter().copied());
        features.extend(numeric);
        features.extend(categorical);

        Ok(EncodedTicket {
            features: Array1::from_vec(features),
            unknown_categories: unknown
                .into_iter()
                .map(|col| CATEGORICAL_COLUMNS[col].to_string())
                .collect(),
        })
    }

    /// Transform a batch of tickets into a feature matrix
    pub fn transform(&self, tickets: &[TicketFeatures]) -> Result<Array2<f64>> {
        let mut matrix = Array2::zeros((tickets.len(), self.n_features()));
        for (ticket, mut row) in tickets.iter().zip(matrix.rows_mut()) {
            row.assign(&self.transform_one(ticket)?.features);
        }
        Ok(matrix)
    }

    pub fn fit_transform(&mut self, tickets: &[TicketFeatures]) -> Result<Array2<f64>> {
        self.fit(tickets)?;
        self.transform(tickets)
    }

    pub fn n_features(&self) -> usize {
        self.tfidf.n_features() + NUMERIC_COLUMNS.len() + self.encoder.n_features()
    }

    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    pub fn vocab_size(&self) -> usize {
        self.tfidf.n_features()
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }
}
