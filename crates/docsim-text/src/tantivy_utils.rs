use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer};

/// English stop words removed before stemming.
pub const STOP_WORDS: &[&str] = &[
	"i","me","my","myself","we","our","ours","ourselves","you","your","yours","yourself","yourselves",
	"he","him","his","himself","she","her","hers","herself","it","its","itself","they","them","their",
	"theirs","themselves","what","which","who","whom","this","that","these","those","am","is","are","was",
	"were","be","been","being","have","has","had","having","do","does","did","doing","a","an","the","and",
	"but","if","or","because","as","until","while","of","at","by","for","with","about","against","between",
	"into","through","during","before","after","above","below","to","from","up","down","in","out","on",
	"off","over","under","again","further","then","once","here","there","when","where","why","how","all",
	"any","both","each","few","more","most","other","some","such","no","nor","not","only","own","same",
	"so","than","too","very","can","will","just","don","should","now","ain","aren","couldn","didn","doesn",
	"hadn","hasn","haven","isn","mightn","mustn","needn","shan","shouldn","wasn","weren","won","wouldn",
];

/// Tokenizer for the lexical pipeline: split on non-alphanumerics, lowercase,
/// drop stop words.
pub fn build_analyzer() -> TextAnalyzer {
	TextAnalyzer::builder(SimpleTokenizer::default())
		.filter(LowerCaser)
		.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
		.build()
}
