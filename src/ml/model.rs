use anyhow::Result;
use burn::{
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use crate::ml::crf::{Crf, CrfConfig};
use crate::ml::joint::{JointInput, JointModel, JointOutput, SlotDecoding, SlotOutput};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally. Do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct JointTransformerConfig {
    pub vocab_size:  usize,
    pub max_seq_len: usize,
    pub d_model:     usize,
    pub num_heads:   usize,
    pub num_layers:  usize,
    pub d_ff:        usize,
    pub num_intents: usize,
    pub num_slots:   usize,
    #[config(default = 2)]
    pub type_vocab_size: usize,
    #[config(default = 0.0)]
    pub dropout: f64,
    #[config(default = false)]
    pub use_crf: bool,
    #[config(default = true)]
    pub use_segment_ids: bool,
}

impl JointTransformerConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> JointTransformer<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device);
        let segment_embedding  = EmbeddingConfig::new(self.type_vocab_size, self.d_model).init(device);
        let layers: Vec<EncoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_encoder_block(device))
            .collect();
        let final_norm  = LayerNormConfig::new(self.d_model).init(device);
        let intent_head = LinearConfig::new(self.d_model, self.num_intents).init(device);
        let slot_head   = LinearConfig::new(self.d_model, self.num_slots).init(device);
        let crf = self.use_crf.then(|| CrfConfig::new(self.num_slots).init(device));
        let dropout = DropoutConfig::new(self.dropout).init();
        JointTransformer {
            token_embedding, position_embedding, segment_embedding, layers,
            final_norm, intent_head, slot_head, crf, dropout,
            use_segment_ids: self.use_segment_ids,
        }
    }

    fn build_encoder_block<B: Backend>(&self, device: &B::Device) -> EncoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        EncoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }
}

#[derive(Module, Debug)]
pub struct EncoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> EncoderBlock<B> {
    /// `pad_mask` is true at padding positions, which no token attends to.
    pub fn forward(&self, x: Tensor<B, 3>, pad_mask: Tensor<B, 2, Bool>) -> Tensor<B, 3> {
        let attn_input  = MhaInput::self_attn(x.clone()).mask_pad(pad_mask);
        let attn_output = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

/// Encoder with an intent head on the first ([CLS]) position and a
/// slot head on every position, plus an optional CRF over slot tags.
#[derive(Module, Debug)]
pub struct JointTransformer<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub segment_embedding:  Embedding<B>,
    pub layers:             Vec<EncoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub intent_head:        Linear<B>,
    pub slot_head:          Linear<B>,
    pub crf:                Option<Crf<B>>,
    pub dropout:            Dropout,
    pub use_segment_ids:    bool,
}

impl<B: Backend> JointTransformer<B> {
    /// input_ids, attention_mask, segment_ids: [batch, seq_len]
    /// → intent logits [batch, num_intents], slot logits [batch, seq_len, num_slots]
    pub fn forward_logits(
        &self,
        input_ids:      Tensor<B, 2, Int>,
        attention_mask: Tensor<B, 2, Int>,
        segment_ids:    Option<Tensor<B, 2, Int>>,
    ) -> (Tensor<B, 2>, Tensor<B, 3>) {
        let [batch_size, seq_len] = input_ids.dims();
        let device = input_ids.device();

        let tok_emb = self.token_embedding.forward(input_ids);

        // Self-attention is permutation-invariant, so position must be injected explicitly.
        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let mut x = tok_emb + self.position_embedding.forward(positions);
        if let Some(segments) = segment_ids {
            x = x + self.segment_embedding.forward(segments);
        }

        let pad_mask = attention_mask.equal_elem(0);
        let mut x = self.dropout.forward(x);
        for layer in &self.layers {
            x = layer.forward(x, pad_mask.clone());
        }
        let x = self.final_norm.forward(x); // [batch, seq_len, d_model]
        let [_, _, d_model] = x.dims();

        let cls = x.clone()
            .slice([0..batch_size, 0..1, 0..d_model])
            .reshape([batch_size, d_model]);
        let intent_logits = self.intent_head.forward(self.dropout.forward(cls));
        let slot_logits   = self.slot_head.forward(self.dropout.forward(x));

        (intent_logits, slot_logits)
    }
}

impl<B: Backend> JointModel<B> for JointTransformer<B> {
    fn expects_segment_ids(&self) -> bool {
        self.use_segment_ids
    }

    fn slot_decoding(&self) -> SlotDecoding {
        if self.crf.is_some() { SlotDecoding::Viterbi } else { SlotDecoding::Raw }
    }

    fn forward(&self, input: JointInput<B>) -> Result<JointOutput<B>> {
        let segment_ids = input.segment_ids.filter(|_| self.use_segment_ids);
        let (intent_logits, slot_logits) = self.forward_logits(
            input.input_ids,
            input.attention_mask.clone(),
            segment_ids,
        );

        let slots = match &self.crf {
            Some(crf) => SlotOutput::Decoded(crf.decode(slot_logits, input.attention_mask)?),
            None      => SlotOutput::Scores(slot_logits),
        };

        Ok(JointOutput { intent_logits, slots })
    }
}
