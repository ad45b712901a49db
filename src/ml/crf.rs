// ============================================================
// Layer 5: CRF Tag Decoder
// ============================================================
// Structured slot decoding. Instead of picking the best tag at each
// position independently, pick the best whole tag sequence under
//
//   score(y) = start[y_0] + Σ_t emission[t][y_t]
//            + Σ_t transition[y_{t-1}][y_t] + end[y_last]
//
// Viterbi finds the argmax in O(len * tags²):
//   forward:   best[t][j] = max_i best[t-1][i] + trans[i][j] + em[t][j]
//   backtrack: follow the stored argmax pointers from the best end tag
//
// Decoding runs over the real (attention mask = 1) prefix of each
// example; the padded tail is filled with tag 0 so every decoded
// row still has seq_len entries.

use anyhow::{anyhow, Result};
use burn::{module::Param, prelude::*};

use crate::ml::inferencer::argmax;

#[derive(Config, Debug)]
pub struct CrfConfig {
    pub num_tags: usize,
}

impl CrfConfig {
    /// Zero-initialised scores; real values come from the checkpoint.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Crf<B> {
        let n = self.num_tags;
        Crf {
            start_transitions: Param::from_tensor(Tensor::zeros([n], device)),
            end_transitions:   Param::from_tensor(Tensor::zeros([n], device)),
            transitions:       Param::from_tensor(Tensor::zeros([n, n], device)),
        }
    }
}

#[derive(Module, Debug)]
pub struct Crf<B: Backend> {
    /// Score of starting a sequence with each tag, `[tags]`
    pub start_transitions: Param<Tensor<B, 1>>,
    /// Score of ending a sequence with each tag, `[tags]`
    pub end_transitions:   Param<Tensor<B, 1>>,
    /// `transitions[i][j]`: score of tag i followed by tag j, `[tags, tags]`
    pub transitions:       Param<Tensor<B, 2>>,
}

impl<B: Backend> Crf<B> {
    /// emissions `[batch, seq_len, tags]`, attention_mask `[batch, seq_len]`
    /// → one tag sequence of length seq_len per example.
    pub fn decode(
        &self,
        emissions:      Tensor<B, 3>,
        attention_mask: Tensor<B, 2, Int>,
    ) -> Result<Vec<Vec<usize>>> {
        let [batch, seq_len, num_tags] = emissions.dims();

        let em:   Vec<f32> = float_vec(emissions)?;
        let mask: Vec<i64> = attention_mask
            .into_data()
            .convert::<i64>()
            .to_vec()
            .map_err(|e| anyhow!("attention mask readback: {e:?}"))?;

        let scores = TransitionScores {
            start:    float_vec(self.start_transitions.val())?,
            end:      float_vec(self.end_transitions.val())?,
            pairwise: float_vec(self.transitions.val())?,
            num_tags,
        };

        let decoded = (0..batch)
            .map(|b| {
                let row_mask = &mask[b * seq_len..(b + 1) * seq_len];
                let len = row_mask.iter().take_while(|&&m| m == 1).count();
                let rows: Vec<&[f32]> = (0..len)
                    .map(|t| {
                        let at = (b * seq_len + t) * num_tags;
                        &em[at..at + num_tags]
                    })
                    .collect();

                let mut tags = scores.best_path(&rows);
                tags.resize(seq_len, 0);
                tags
            })
            .collect();

        Ok(decoded)
    }
}

fn float_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Result<Vec<f32>> {
    tensor
        .into_data()
        .convert::<f32>()
        .to_vec()
        .map_err(|e| anyhow!("tensor readback: {e:?}"))
}

/// Host-side copy of the CRF parameters.
#[derive(Debug, Clone)]
pub struct TransitionScores {
    pub start:    Vec<f32>,
    pub end:      Vec<f32>,
    /// Row-major `[from, to]`
    pub pairwise: Vec<f32>,
    pub num_tags: usize,
}

impl TransitionScores {
    /// Highest scoring tag sequence for `emissions` (one row of
    /// `num_tags` scores per position). Ties go to the lower tag id.
    pub fn best_path(&self, emissions: &[&[f32]]) -> Vec<usize> {
        let n = self.num_tags;
        let Some(first) = emissions.first() else {
            return Vec::new();
        };

        // ── Forward pass ─────────────────────────────────────────────────────
        let mut score: Vec<f32> = (0..n).map(|j| self.start[j] + first[j]).collect();
        let mut history: Vec<Vec<usize>> = Vec::with_capacity(emissions.len() - 1);

        for row in &emissions[1..] {
            let mut next = vec![f32::NEG_INFINITY; n];
            let mut back = vec![0usize; n];
            for j in 0..n {
                for i in 0..n {
                    let s = score[i] + self.pairwise[i * n + j];
                    if s > next[j] {
                        next[j] = s;
                        back[j] = i;
                    }
                }
                next[j] += row[j];
            }
            score = next;
            history.push(back);
        }

        for (s, e) in score.iter_mut().zip(&self.end) {
            *s += e;
        }

        // ── Backtrack ────────────────────────────────────────────────────────
        let mut best = argmax(&score).unwrap_or(0);
        let mut path = Vec::with_capacity(emissions.len());
        path.push(best);
        for back in history.iter().rev() {
            best = back[best];
            path.push(best);
        }
        path.reverse();
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::TestBackend;

    // tags: 0 = O, 1 = B, 2 = I
    fn bio_constraints() -> TransitionScores {
        let mut pairwise = vec![0.0; 9];
        pairwise[2] = -10.0; // O -> I forbidden
        TransitionScores {
            start:    vec![0.0, 0.0, -10.0], // no sentence-initial I
            end:      vec![0.0; 3],
            pairwise,
            num_tags: 3,
        }
    }

    #[test]
    fn test_transitions_override_local_argmax() {
        let t0 = [0.0, 1.0, 2.0];
        let t1 = [1.0, 0.0, 2.0];
        // Per-position argmax would give [I, I]
        assert_eq!(bio_constraints().best_path(&[&t0, &t1]), vec![1, 2]);
    }

    #[test]
    fn test_zero_transitions_match_argmax() {
        let flat = TransitionScores {
            start:    vec![0.0; 3],
            end:      vec![0.0; 3],
            pairwise: vec![0.0; 9],
            num_tags: 3,
        };
        let rows: [&[f32]; 3] = [&[0.1, 0.9, 0.0], &[0.5, 0.2, 0.3], &[0.0, 0.0, 1.0]];
        assert_eq!(flat.best_path(&rows), vec![1, 0, 2]);
    }

    #[test]
    fn test_empty_sequence() {
        assert!(bio_constraints().best_path(&[]).is_empty());
    }

    #[test]
    fn test_decode_respects_attention_mask() {
        let device = Default::default();
        let crf: Crf<TestBackend> = CrfConfig::new(3).init(&device);

        // Two examples of length 4, peaks at tags 2,1,0,2 and 1,1,2,2
        let peaks = [[2usize, 1, 0, 2], [1, 1, 2, 2]];
        let mut flat = Vec::new();
        for row in &peaks {
            for &tag in row {
                let mut v = [0.0f32; 3];
                v[tag] = 1.0;
                flat.extend(v);
            }
        }
        let emissions = Tensor::<TestBackend, 3>::from_data(TensorData::new(flat, [2, 4, 3]), &device);
        let mask = Tensor::<TestBackend, 1, Int>::from_ints([1, 1, 1, 1, 1, 1, 0, 0], &device)
            .reshape([2, 4]);

        let tags = crf.decode(emissions, mask).unwrap();
        assert_eq!(tags, vec![vec![2, 1, 0, 2], vec![1, 1, 0, 0]]);
    }
}
